// ────────────────────────────────
// src/proxy/relay.rs
// Byte relay between an accepted client and its chosen backend
// ────────────────────────────────

use crate::config::RelayConfig;
use crate::proxy::{Backend, ProxyError};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Byte counts of one finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayStats {
    pub client_to_backend: u64,
    pub backend_to_client: u64,
    /// False when either direction ended with an I/O error.
    pub clean: bool,
}

#[derive(Debug, Clone)]
pub struct Relay {
    connect_timeout: Duration,
    buffer_size: usize,
}

enum PipeEnd {
    Eof,
    Failed(io::Error),
    Aborted,
}

impl Relay {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            buffer_size: config.buffer_size.max(1),
        }
    }

    /// Dial `backend` and copy bytes both ways.
    ///
    /// The first direction to finish, by EOF or error, stops the other one
    /// once that one's in-flight write has landed. Returns after both
    /// directions have ended; both sockets are closed on return. A failed
    /// dial drops `client` without sending it anything.
    pub async fn serve(&self, client: TcpStream, backend: &Backend) -> Result<RelayStats, ProxyError> {
        let backend_stream = match backend.dial(self.connect_timeout).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(backend = %backend.id, error = %e, "Error connecting to backend server");
                return Err(e);
            }
        };
        backend_stream.set_nodelay(true)?;

        let (client_read, client_write) = client.into_split();
        let (backend_read, backend_write) = backend_stream.into_split();
        let (abort, _) = watch::channel(false);

        let ((upstream, upstream_end), (downstream, downstream_end)) = tokio::join!(
            pipe(client_read, backend_write, &abort, self.buffer_size),
            pipe(backend_read, client_write, &abort, self.buffer_size),
        );

        info!(backend = %backend.id, bytes = upstream, "Copied client to backend");
        info!(backend = %backend.id, bytes = downstream, "Copied backend to client");

        let mut clean = true;
        for (direction, end) in [("client_to_backend", upstream_end), ("backend_to_client", downstream_end)] {
            match end {
                PipeEnd::Failed(e) => {
                    clean = false;
                    warn!(backend = %backend.id, direction, error = %e, "Relay direction failed");
                }
                PipeEnd::Aborted => {
                    debug!(backend = %backend.id, direction, "Relay direction stopped after opposite side finished");
                }
                PipeEnd::Eof => {}
            }
        }

        Ok(RelayStats {
            client_to_backend: upstream,
            backend_to_client: downstream,
            clean,
        })
    }
}

async fn stopped(abort: &mut watch::Receiver<bool>) {
    let _ = abort.wait_for(|stop| *stop).await;
}

async fn pipe<R, W>(
    mut reader: R,
    mut writer: W,
    abort: &watch::Sender<bool>,
    buffer_size: usize,
) -> (u64, PipeEnd)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut aborted = abort.subscribe();
    let mut buf = vec![0u8; buffer_size];
    let mut bytes = 0u64;

    let end = loop {
        let n = tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => break PipeEnd::Eof,
                Ok(n) => n,
                Err(e) => break PipeEnd::Failed(e),
            },
            _ = stopped(&mut aborted) => break PipeEnd::Aborted,
        };

        // Not raced against `aborted`: a chunk already read is always delivered.
        if let Err(e) = writer.write_all(&buf[..n]).await {
            break PipeEnd::Failed(e);
        }
        bytes += n as u64;
    };

    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "Shutdown of relay destination failed");
    }
    if !matches!(end, PipeEnd::Aborted) {
        abort.send_replace(true);
    }

    (bytes, end)
}
