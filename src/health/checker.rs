// src/health/checker.rs
use crate::config::HealthCheckConfig;
use crate::proxy::{Backend, BackendRegistry};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Periodically dials every backend and records whether it answered.
pub struct HealthChecker {
    config: HealthCheckConfig,
    registry: Arc<BackendRegistry>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

#[derive(Debug)]
pub struct HealthCheckResult {
    pub backend_id: String,
    pub healthy: bool,
    pub response_time_ms: u64,
    pub error: Option<String>,
}

impl HealthChecker {
    pub fn new(config: HealthCheckConfig, registry: Arc<BackendRegistry>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            registry,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Run `start` on its own task.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(self.clone().start())
    }

    /// Probe loop. The first tick fires one interval after the call;
    /// returns once `shutdown` is observed.
    pub async fn start(self: Arc<Self>) {
        let period = self.config.interval();
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_rx = self.shutdown_rx.clone();

        info!(
            interval_ms = self.config.interval_ms,
            timeout_ms = self.config.timeout_ms,
            backends = self.registry.len(),
            "Starting health checker"
        );

        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.check_all_backends().await;
                }
            }
        }

        info!("Health checker shutting down");
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    fn is_shut_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// One probe cycle, in registry order. Backends not yet probed when
    /// shutdown is requested are left untouched.
    pub async fn check_all_backends(&self) -> Vec<HealthCheckResult> {
        let mut results = Vec::with_capacity(self.registry.len());

        for backend in self.registry.all() {
            if self.is_shut_down() {
                debug!("Shutdown requested, abandoning probe cycle");
                break;
            }
            let result = self.check_backend(backend).await;
            self.registry.set_health(backend, result.healthy).await;
            results.push(result);
        }

        let healthy_count = results.iter().filter(|r| r.healthy).count();
        let slowest_probe_ms = results.iter().map(|r| r.response_time_ms).max().unwrap_or(0);
        info!(
            healthy = healthy_count,
            unhealthy = results.len() - healthy_count,
            slowest_probe_ms,
            "Health check complete"
        );

        results
    }

    async fn check_backend(&self, backend: &Backend) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let outcome = backend.dial(self.config.timeout()).await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        let (healthy, error) = match outcome {
            Ok(stream) => {
                // Probe only; nothing is exchanged.
                drop(stream);
                debug!(backend = %backend.id, response_time_ms, "Backend probe succeeded");
                (true, None)
            }
            Err(e) => {
                warn!(backend = %backend.id, error = %e, "Error connecting to backend server");
                (false, Some(e.to_string()))
            }
        };

        HealthCheckResult {
            backend_id: backend.id.clone(),
            healthy,
            response_time_ms,
            error,
        }
    }
}
