//! tps-search - training placement school finder service
//!
//! Serves location, provider and school searches over the placements
//! database, with facet filtering, pagination and CSV export.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tps_common::config::{database_path, resolve_root_folder, TomlConfig, ENV_ROOT_FOLDER};
use tps_search::db::{connect_readonly, SqlLabelResolver};
use tps_search::geocoding::GooglePlacesClient;
use tps_search::state_store::MemoryFilterStore;
use tps_search::{build_router, AppState, SearchSettings};

/// Port used when neither CLI, environment nor config sets one
const DEFAULT_PORT: u16 = 5780;

/// Command-line arguments for tps-search
#[derive(Parser, Debug)]
#[command(name = "tps-search")]
#[command(about = "Training placement school finder")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "TPS_PORT")]
    port: Option<u16>,

    /// Root folder holding placements.db
    #[arg(short, long, env = ENV_ROOT_FOLDER)]
    root_folder: Option<PathBuf>,

    /// Bootstrap TOML config file
    #[arg(short, long, env = "TPS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default(args.config.as_deref());

    // RUST_LOG wins over the config file level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tps_search={0},tps_common={0},tower_http={0}", config.logging.level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting training placement school finder (tps-search) v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Env var is read by clap; pass the already-resolved value as the CLI tier
    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ENV_ROOT_FOLDER, &config);
    let db_path = database_path(&root_folder);
    info!("Root folder: {}", root_folder.display());
    info!("Database path: {}", db_path.display());

    let pool = connect_readonly(&db_path).await?;
    info!("✓ Connected to database (read-only)");

    if config.geocoding.api_key.is_none() {
        info!("No geocoding API key configured; location search will redirect to the entry form");
    }
    let geocoder = GooglePlacesClient::new(
        &config.geocoding.base_url,
        config.geocoding.api_key.clone(),
    )
    .context("Failed to build geocoding client")?;

    let state = AppState::new(
        pool.clone(),
        Arc::new(geocoder),
        Arc::new(SqlLabelResolver::new(pool)),
        Arc::new(MemoryFilterStore::with_limits(
            Duration::from_secs(config.search.session_idle_minutes * 60),
            config.search.max_sessions,
        )),
        SearchSettings::from(&config.search),
    );
    let app = build_router(state);

    let port = args.port.or(config.port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("tps-search listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
