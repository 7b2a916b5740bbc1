// src/load_balancer/algorithm.rs
use crate::proxy::{Backend, BackendRegistry};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;

/// Picks the backend for a new client connection.
///
/// The registry is never empty, so every call yields a backend; a policy
/// that finds nothing healthy falls back instead of refusing the client.
#[async_trait]
pub trait LoadBalancer: Send + Sync {
    async fn select_backend(
        &self,
        registry: &BackendRegistry,
        client_addr: Option<SocketAddr>,
    ) -> Arc<Backend>;

    fn name(&self) -> &'static str;
}
