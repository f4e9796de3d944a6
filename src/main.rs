mod config;
mod db;
mod protocol;
mod routes;
mod services;
mod shape;
mod state;
mod store;

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::store::memory::{MemoryBoardStore, MemoryShapeStore};
use crate::store::postgres::{PgBoardStore, PgShapeStore};
use crate::store::{BoardStore, ShapeStore};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("database init failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to bind port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },
    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = RelayConfig::from_env();
    let port = config.port;

    let (boards, shapes): (Arc<dyn BoardStore>, Arc<dyn ShapeStore>) = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections).await?;
            tracing::info!(max_connections = config.db_max_connections, "postgres store ready");
            (Arc::new(PgBoardStore::new(pool.clone())), Arc::new(PgShapeStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, nothing survives a restart");
            (Arc::new(MemoryBoardStore::new()), Arc::new(MemoryShapeStore::new()))
        }
    };

    let state = state::AppState::new(config, boards, shapes);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|source| StartupError::Bind { port, source })?;

    tracing::info!(%port, "synapse relay listening");
    axum::serve(listener, app).await.map_err(StartupError::Serve)
}
