use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use ev_maintenance_api::config::{Cli, Config, MODEL_VERSION};
use ev_maintenance_api::predictor::engine::EvMaintenancePredictor;
use ev_maintenance_api::server::maintenance_api::{build_router, cors_layer, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "ev_maintenance_api=debug,tower_http=debug"
    } else {
        "ev_maintenance_api=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!(
        model_version = MODEL_VERSION,
        "ev-maintenance-api v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration.
    let config = Config::load(&cli.config)?;

    // Load the predictor before accepting traffic. A broken model bundle
    // must abort startup, never serve degraded predictions.
    let predictor = match EvMaintenancePredictor::load(&config.model) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            error!(error = %e, "Failed to load models");
            return Err(e.into());
        }
    };
    info!("Models loaded");

    // Build application state.
    let state = Arc::new(AppState {
        predictor: Some(predictor),
        start_time: Instant::now(),
    });

    // Build the HTTP router.
    let cors = cors_layer(&config)?;
    let app = build_router(state, cors);

    // Start the server.
    let listen_addr = cli.listen;
    info!(addr = listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // State (and with it the predictor) drops here.
    info!("Cleanup complete");

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down");
}
