//! `portfolio-server`: the portfolio CRUD API over HTTP.
//!
//! # Quick start
//!
//! ```sh
//! # In-memory server on the default port:
//! portfolio-server
//!
//! # Persistent SQLite server on a custom address:
//! PORTFOLIO_DB=./portfolio.db PORTFOLIO_BIND=127.0.0.1:8080 portfolio-server
//! ```
//!
//! # Environment variables
//!
//! See [`ServerConfig`] for the full list.

use std::error::Error;
use std::sync::Arc;

use portfolio_server::{
    build_router, MemoryStorage, ResourceRegistry, ServerConfig, SqliteStorage, Storage,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portfolio_server=info,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let storage: Arc<dyn Storage> = match &config.db_path {
        Some(path) => {
            tracing::info!("storage: SQLite at {path}");
            Arc::new(
                SqliteStorage::open(path)
                    .map_err(|e| format!("failed to open SQLite database at {path}: {e}"))?,
            )
        }
        None => {
            tracing::info!("storage: in-memory (data will not survive restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    let app = build_router(storage, ResourceRegistry::portfolio());

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", config.bind_addr))?;

    axum::serve(listener, app).await?;
    Ok(())
}
