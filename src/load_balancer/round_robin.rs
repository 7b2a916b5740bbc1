// src/load_balancer/round_robin.rs
use crate::load_balancer::LoadBalancer;
use crate::proxy::{Backend, BackendRegistry};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Cycles through backends in registry order, skipping unhealthy ones.
pub struct RoundRobinBalancer {
    /// Index of the last backend handed out; `None` until the first pick.
    current: Mutex<Option<usize>>,
}

impl RoundRobinBalancer {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Start as if `index` had just been selected.
    pub fn with_cursor(index: usize) -> Self {
        Self {
            current: Mutex::new(Some(index)),
        }
    }

    pub async fn cursor(&self) -> Option<usize> {
        *self.current.lock().await
    }
}

impl Default for RoundRobinBalancer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoadBalancer for RoundRobinBalancer {
    async fn select_backend(
        &self,
        registry: &BackendRegistry,
        _client_addr: Option<SocketAddr>,
    ) -> Arc<Backend> {
        let total = registry.len();
        // Held across the whole scan so concurrent selections are totally ordered.
        let mut current = self.current.lock().await;
        let start = current.map_or(0, |c| (c + 1) % total);

        let mut index = start;
        for _ in 0..total {
            let candidate = registry.get(index);
            if candidate.is_healthy().await {
                *current = Some(index);
                debug!(
                    backend = %candidate.id,
                    index,
                    algorithm = self.name(),
                    "Selected backend"
                );
                return candidate.clone();
            }
            index = (index + 1) % total;
        }

        // Nothing healthy: serve the first candidate and keep rotating.
        *current = Some(start);
        let fallback = registry.get(start);
        warn!(
            backend = %fallback.id,
            index = start,
            total,
            "Round robin found no healthy backend, serving possibly unhealthy backend"
        );
        fallback.clone()
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
