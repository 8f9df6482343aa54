pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod giveaway;
pub mod state;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Config;
use crate::db::MemoryDatastore;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            error!("Can't load configuration: {}", err);
            return;
        }
    };

    info!("Initializing state...");
    let store = Arc::new(MemoryDatastore::with_capacity(config.events_capacity));
    let address = config.address();
    let state = AppState::new(config, store);

    let app = match api::router(state) {
        Ok(app) => app,
        Err(err) => {
            error!("Can't build the router: {}", err);
            return;
        }
    };

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .expect("Failed to bind the server address");
    info!("Server running on {address}");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {:?}", err);
    }

    info!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
