// src/proxy/backend.rs
use crate::config::{BackendConfig, Protocol};
use crate::proxy::ProxyError;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl From<bool> for HealthStatus {
    fn from(healthy: bool) -> Self {
        if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

/// One upstream server. Host and port never change after startup; the
/// health flag is the only state the health checker writes.
#[derive(Debug)]
pub struct Backend {
    pub id: String,
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,

    // Runtime state
    health_status: RwLock<HealthStatus>,
    last_health_check: RwLock<Option<DateTime<Utc>>>,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
}

impl Backend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            id: config.address(),
            protocol: config.protocol,
            host: config.host.clone(),
            port: config.port,
            health_status: RwLock::new(config.healthy.into()),
            last_health_check: RwLock::new(None),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
        }
    }

    /// Open a stream to this backend, bounded by `limit`.
    ///
    /// Shared by the health probe and the relay.
    pub async fn dial(&self, limit: Duration) -> Result<TcpStream, ProxyError> {
        tracing::trace!(backend = %self.id, protocol = %self.protocol, "Dialing backend");
        match timeout(limit, TcpStream::connect((self.host.as_str(), self.port))).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(ProxyError::BackendConnect {
                backend: self.id.clone(),
                source,
            }),
            Err(_) => Err(ProxyError::ConnectTimeout {
                backend: self.id.clone(),
                timeout: limit,
            }),
        }
    }

    pub async fn is_healthy(&self) -> bool {
        *self.health_status.read().await == HealthStatus::Healthy
    }

    /// Record a probe outcome. Returns the previous status.
    pub async fn update_health(&self, healthy: bool) -> HealthStatus {
        let mut status = self.health_status.write().await;
        let previous = *status;
        *status = if healthy {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            self.consecutive_successes.fetch_add(1, Ordering::Relaxed);
            HealthStatus::Healthy
        } else {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
            HealthStatus::Unhealthy
        };
        drop(status);

        let mut last_check = self.last_health_check.write().await;
        *last_check = Some(Utc::now());
        previous
    }

    pub async fn last_health_check(&self) -> Option<DateTime<Utc>> {
        *self.last_health_check.read().await
    }

    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn consecutive_successes(&self) -> usize {
        self.consecutive_successes.load(Ordering::Relaxed)
    }
}
