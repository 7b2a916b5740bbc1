// src/proxy/error.rs
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("backend registry must contain at least one backend")]
    EmptyRegistry,

    #[error("failed to connect to backend {backend}: {source}")]
    BackendConnect {
        backend: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to backend {backend} timed out after {timeout:?}")]
    ConnectTimeout { backend: String, timeout: Duration },

    #[error("relay I/O error: {0}")]
    Io(#[from] std::io::Error),
}
