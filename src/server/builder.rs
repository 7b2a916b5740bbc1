// ────────────────────────────────
// src/server/builder.rs
// ────────────────────────────────
use crate::server::handler::ConnectionHandler;
use crate::server::listener::bind_tcp;
use anyhow::{Context, Result};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::net::TcpListener;

/// Pause after a failed accept so a persistent error (e.g. EMFILE) cannot spin.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Builder pattern so `main.rs` can inject its connection handler.
pub struct ServerBuilder {
    addr: String,
    handler: Option<ConnectionHandler>,
}

impl ServerBuilder {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            handler: None,
        }
    }

    pub fn with_handler(mut self, handler: ConnectionHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Bind, then accept until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = bind_tcp(&self.addr).await?;
        let handler = self
            .handler
            .context("handler must be set via with_handler()")?;
        tracing::info!(addr = %self.addr, "Server listening");
        serve_listener(listener, handler, shutdown).await;
        Ok(())
    }
}

/// Accept loop over an already-bound listener. Every client gets its own
/// task; accept errors are logged and the loop carries on.
pub async fn serve_listener<F>(listener: TcpListener, handler: ConnectionHandler, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Accept loop stopped");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(err) => {
                    tracing::error!(%err, "Error accepting connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            },
        };

        let svc = handler.clone();
        tokio::spawn(async move {
            let session = AssertUnwindSafe(svc.handle(stream, Some(peer))).catch_unwind();
            match session.await {
                Ok(Ok(stats)) => {
                    tracing::debug!(
                        %peer,
                        client_to_backend = stats.client_to_backend,
                        backend_to_client = stats.backend_to_client,
                        clean = stats.clean,
                        "Session closed"
                    );
                }
                Ok(Err(err)) => tracing::warn!(%peer, %err, "Session abandoned"),
                Err(_) => tracing::error!(%peer, "Session task panicked"),
            }
        });
    }
}
