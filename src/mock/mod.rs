// src/mock/mod.rs
// Local stand-in backends: read one message, log it, answer with a greeting
// naming the port, close.

use crate::config::BackendConfig;
use crate::server::builder::ACCEPT_ERROR_BACKOFF;
use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{error, info};

const READ_LIMIT: usize = 256;

pub fn greeting(port: u16) -> String {
    format!("What is up client. From port {port}")
}

/// Bind and serve one mock backend per config entry.
///
/// Fails if any of them cannot bind.
pub async fn spawn_mock_backends(backends: &[BackendConfig]) -> Result<Vec<JoinHandle<()>>> {
    let mut handles = Vec::with_capacity(backends.len());
    for (number, backend) in backends.iter().enumerate() {
        let listener = TcpListener::bind((backend.host.as_str(), backend.port))
            .await
            .with_context(|| format!("Failed to start mock backend on {}", backend.address()))?;
        info!(number, port = backend.port, "Mock backend server listening");
        handles.push(tokio::spawn(serve_mock_backend(listener, backend.port)));
    }
    Ok(handles)
}

pub async fn serve_mock_backend(listener: TcpListener, port: u16) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                tokio::spawn(handle_connection(stream, port));
            }
            Err(e) => {
                error!(port, error = %e, "Error accepting connection");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, port: u16) {
    let mut data = [0u8; READ_LIMIT];
    let n = match stream.read(&mut data).await {
        Ok(n) => n,
        Err(e) => {
            error!(port, error = %e, "Error reading from connection");
            return;
        }
    };
    info!(
        port,
        bytes_count = n,
        payload = %String::from_utf8_lossy(&data[..n]),
        "Mock backend received message"
    );

    if let Err(e) = stream.write_all(greeting(port).as_bytes()).await {
        error!(port, error = %e, "Error writing to connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_replies_with_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(serve_mock_backend(listener, port));

        let mut client = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        client.write_all(b"hi").await.unwrap();

        let mut reply = String::new();
        client.read_to_string(&mut reply).await.unwrap();
        assert_eq!(reply, greeting(port));
    }

    #[tokio::test]
    async fn test_bind_conflict_is_fatal() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let result = spawn_mock_backends(&[BackendConfig::new("127.0.0.1", port)]).await;
        assert!(result.is_err());
    }
}
