//
// src/proxy/mod.rs
//
mod backend;
mod error;
mod registry;
mod relay;

pub use backend::{Backend, HealthStatus};
pub use error::ProxyError;
pub use registry::BackendRegistry;
pub use relay::{Relay, RelayStats};
