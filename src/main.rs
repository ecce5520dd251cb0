//! Proxy relay - Entry Point
//!
//! Starts the pool refresher and the API server with graceful shutdown support.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use proxyrelay::api::ApiServer;
use proxyrelay::config::{Config, LogConfig};
use proxyrelay::services::{PoolRefresher, PoolRefresherHandle};
use proxyrelay::RelayService;

#[tokio::main]
async fn main() -> proxyrelay::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    init_tracing(&config.log);
    info!("Starting proxy relay");

    let service = Arc::new(RelayService::new(config.clone())?);

    // Create shutdown channel
    let (shutdown_tx, _) = watch::channel(false);

    // Start pool refresher; it performs the initial population
    let (refresher_handle, refresher_shutdown) = PoolRefresherHandle::new();
    let refresher = PoolRefresher::new(service.pool().clone());
    let refresher_task = tokio::spawn(async move {
        refresher.run(refresher_shutdown).await;
    });

    // Start API server
    let api_server = ApiServer::new(config.api.clone(), service.clone());
    let api_shutdown = shutdown_tx.subscribe();
    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run(api_shutdown).await {
            error!("API server error: {}", e);
        }
    });

    info!("API listening on {}", config.api_addr());

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    refresher_handle.shutdown();

    let _ = tokio::join!(api_task, refresher_task);

    info!("Proxy relay stopped");
    Ok(())
}

/// Initialize tracing; `RUST_LOG` overrides the configured level
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("proxyrelay={},tower_http=info", log.level).into()
    });

    let (json, pretty) = if log.format.eq_ignore_ascii_case("pretty") {
        (None, Some(tracing_subscriber::fmt::layer().pretty()))
    } else {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .init();
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
}
