// src/main.rs
use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tcp_load_balancer::{
    config::{self, LogFormat, LoggingConfig},
    health::HealthChecker,
    load_balancer::create_load_balancer,
    mock,
    proxy::{BackendRegistry, Relay},
    server::{ConnectionHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = config::load_config(&config_path).await?;

    init_tracing(&config.logging)?;
    info!(path = %config_path, algorithm = ?config.algorithm, "Configuration loaded");

    // Backends are fixed for the process lifetime
    let registry = Arc::new(BackendRegistry::new(&config.backends)?);

    if config.mock_backends {
        mock::spawn_mock_backends(&config.backends).await?;
    }

    let health_checker = Arc::new(HealthChecker::new(
        config.health_check.clone(),
        registry.clone(),
    ));
    let health_task = health_checker.spawn();

    let handler = ConnectionHandler::new(
        registry,
        create_load_balancer(config.algorithm),
        Relay::new(&config.relay),
    );

    ServerBuilder::new(config.listen.address())
        .with_handler(handler)
        .serve(shutdown_signal())
        .await?;

    health_checker.shutdown();
    if let Err(e) = health_task.await {
        warn!(error = %e, "Health checker task ended abnormally");
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.filter)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
