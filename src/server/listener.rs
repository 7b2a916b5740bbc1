// ────────────────────────────────
// src/server/listener.rs
// Encapsulates low‑level TCP bind so startup failures carry the address.
// ────────────────────────────────
use anyhow::{Context, Result};
use tokio::net::TcpListener;

pub async fn bind_tcp(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Error starting TCP server on {addr}"))?;
    Ok(listener)
}
