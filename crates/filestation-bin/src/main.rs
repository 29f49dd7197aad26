use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use filestation_lib::{auth::spawn_reclaimer, config::Settings, AppState};

use crate::routes::ServerState;
use crate::store::FileStore;

mod error;
mod routes;
mod store;

/// Single-admin file drop station.
#[derive(Parser)]
#[command(name = "filestation")]
struct Args {
    /// Port to listen on (overrides the configured bind address)
    #[arg(long)]
    port: Option<u16>,
    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    if let Some(port) = args.port {
        settings.bind_addr.set_port(port);
    }

    let store = FileStore::new(&settings.upload_dir)?;
    let app_state = AppState::new(settings)?;
    let reclaimer = spawn_reclaimer(app_state.auth.clone(), app_state.settings.reclaim_interval());
    let file_sweeper = spawn_file_sweeper(store.clone(), app_state.settings.reclaim_interval());

    let state = ServerState {
        app: app_state.clone(),
        store,
    };
    let app = routes::router(state);
    let listener = TcpListener::bind(app_state.settings.bind_addr).await?;
    tracing::info!(addr = %app_state.settings.bind_addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    file_sweeper.abort();
    reclaimer.shutdown().await;
    Ok(())
}

/// Periodically delete expired shared files, on the same cadence as the
/// auth reclaimer.
fn spawn_file_sweeper(
    store: FileStore,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.sweep_expired().await {
                Ok(0) => {},
                Ok(removed) => tracing::info!(removed, "removed expired files"),
                Err(err) => tracing::warn!(error = %err, "file sweep failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}
