//! Tournament bracket server.
//!
//! Serves the bracket API over PostgreSQL or, for local runs, process memory.

use std::sync::Arc;

use anyhow::{Context, Error, anyhow, bail};
use bracket_engine::db::{BracketRepository, Database, MemoryRepository};
use bracket_server::{
    api,
    config::{CliOverrides, ServerConfig, StorageBackend},
    logging, metrics,
};
use log::{info, warn};
use pico_args::Arguments;

const HELP: &str = "\
Run the tournament bracket server

USAGE:
  bracket_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --storage    BACKEND     postgres or memory          [default: env BRACKET_STORAGE or postgres]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  BRACKET_STORAGE          Storage backend
  METRICS_BIND             Prometheus exporter address, disabled when unset
  DB_MAX_CONNECTIONS       Pool size, see also DB_MIN_CONNECTIONS, DB_CONNECTION_TIMEOUT
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let overrides = CliOverrides {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        storage: pargs.opt_value_from_str("--storage")?,
    };
    let remaining = pargs.finish();
    if !remaining.is_empty() {
        bail!("Unexpected arguments: {:?}", remaining);
    }

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics at http://{}/metrics", addr);
    }

    let repository: Arc<dyn BracketRepository> = match config.storage {
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;
            db.migrate().await.context("Failed to apply schema")?;
            info!("Database connected successfully");
            Arc::new(db.repository())
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; all tournaments are lost on shutdown");
            Arc::new(MemoryRepository::new())
        }
    };

    let app = api::create_router(api::AppState::new(repository));

    info!(
        "Starting HTTP server on {} ({} storage)",
        config.bind, config.storage
    );
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
