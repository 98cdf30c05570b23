mod config;
mod http;
mod models;
mod omdb;
mod tmdb;
mod watchlist;
mod web;

use anyhow::{Context, Result};
use clap::Parser;
use config::{key_preview, Configuration};
use http::HttpClient;
use omdb::OmdbClient;
use std::path::PathBuf;
use std::sync::Arc;
use tmdb::TmdbClient;
use tokio::signal;
use tracing::{info, warn};
use watchlist::WatchlistStore;
use web::AppState;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .init();

    info!("Starting Muvi v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Configuration::load(&cli.config)?;
    config.validate()?;
    info!("Configuration loaded from: {:?}", cli.config);
    info!("TMDB API key: {}", key_preview(&config.tmdb.api_key));
    info!("OMDb API key: {}", key_preview(&config.omdb.api_key));

    let http_client =
        HttpClient::new(config.request_timeout()).context("Failed to build HTTP client")?;
    let tmdb = TmdbClient::new(http_client.clone(), config.tmdb.clone());
    let omdb = OmdbClient::new(http_client, config.omdb.clone());

    let store = Arc::new(WatchlistStore::open(&config.watchlist.path));
    let state = Arc::new(AppState::new(tmdb, omdb, store));
    let app = web::create_router(state, &config.static_dir);

    let addr = config.listen_addr()?;
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
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
