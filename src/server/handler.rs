// src/server/handler.rs
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::Instrument;

use crate::load_balancer::LoadBalancer;
use crate::proxy::{BackendRegistry, ProxyError, Relay, RelayStats};

/// Select-then-relay for one accepted client connection.
#[derive(Clone)]
pub struct ConnectionHandler {
    registry: Arc<BackendRegistry>,
    balancer: Arc<dyn LoadBalancer>,
    relay: Arc<Relay>,
}

impl ConnectionHandler {
    pub fn new(registry: Arc<BackendRegistry>, balancer: Arc<dyn LoadBalancer>, relay: Relay) -> Self {
        Self {
            registry,
            balancer,
            relay: Arc::new(relay),
        }
    }

    pub async fn handle(&self, stream: TcpStream, peer: Option<SocketAddr>) -> Result<RelayStats, ProxyError> {
        let backend = self.balancer.select_backend(&self.registry, peer).await;
        let session = tracing::info_span!(
            "session",
            id = %uuid::Uuid::new_v4(),
            client = ?peer,
            backend = %backend.id,
        );

        async {
            tracing::debug!(algorithm = self.balancer.name(), "Relaying connection");
            self.relay.serve(stream, &backend).await
        }
        .instrument(session)
        .await
    }
}
