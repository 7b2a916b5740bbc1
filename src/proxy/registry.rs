//
// src/proxy/registry.rs
//

use super::backend::{Backend, HealthStatus};
use crate::config::BackendConfig;
use crate::proxy::ProxyError;
use std::sync::Arc;

/// Fixed, ordered set of backends.
///
/// Entries are never added, removed or reordered after construction, so an
/// index handed out by a balancer stays valid for the life of the process.
/// Each backend guards its own health flag; updating one backend never
/// contends with reads of another.
#[derive(Debug)]
pub struct BackendRegistry {
    backends: Vec<Arc<Backend>>,
}

impl BackendRegistry {
    pub fn new(configs: &[BackendConfig]) -> Result<Self, ProxyError> {
        if configs.is_empty() {
            return Err(ProxyError::EmptyRegistry);
        }

        let backends = configs
            .iter()
            .map(|config| Arc::new(Backend::new(config)))
            .collect();

        Ok(Self { backends })
    }

    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn get(&self, index: usize) -> &Arc<Backend> {
        &self.backends[index]
    }

    pub fn all(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Always false; construction rejects an empty list.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub async fn set_health(&self, backend: &Backend, healthy: bool) {
        let previous = backend.update_health(healthy).await;
        if previous != HealthStatus::from(healthy) {
            if healthy {
                tracing::info!(
                    backend = %backend.id,
                    successes = backend.consecutive_successes(),
                    "Backend is now healthy"
                );
            } else {
                tracing::warn!(
                    backend = %backend.id,
                    failures = backend.consecutive_failures(),
                    "Backend is now unhealthy"
                );
            }
        }
    }

    pub async fn healthy_count(&self) -> usize {
        let mut healthy = 0;
        for backend in &self.backends {
            if backend.is_healthy().await {
                healthy += 1;
            }
        }
        healthy
    }
}
