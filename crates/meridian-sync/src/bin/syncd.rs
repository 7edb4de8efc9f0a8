//! # syncd: Meridian Sync Server
//!
//! Serves the batch reconciliation and propagation endpoints over HTTP.
//!
//! ## Environment
//! ```text
//! MERIDIAN_BIND        listen address      (default 127.0.0.1:8080)
//! MERIDIAN_DB_PATH     SQLite file path    (default ./meridian.db)
//! MERIDIAN_DATA_DIR    local store root    (default ./meridian-data)
//! RUST_LOG             tracing filter      (default info)
//! ```

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use meridian_db::{Database, DbConfig};
use meridian_store::{StorageContext, StorageSettings};
use meridian_sync::config::SyncConfig;
use meridian_sync::engine::ReconcileEngine;
use meridian_sync::http::{router, ApiState};
use meridian_sync::propagate::Propagator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(SyncConfig::load_or_default(None));

    let db_path =
        std::env::var("MERIDIAN_DB_PATH").unwrap_or_else(|_| "meridian.db".to_string());
    let database = Database::new(DbConfig::new(&db_path)).await?;

    let data_dir =
        std::env::var("MERIDIAN_DATA_DIR").unwrap_or_else(|_| "meridian-data".to_string());
    let storage = Arc::new(StorageContext::new(
        StorageSettings::new(&data_dir),
        Some(database.clone()),
        None,
    ));

    let state = ApiState {
        engine: Arc::new(ReconcileEngine::new(&database, config)),
        propagator: Arc::new(Propagator::new(&database, storage)),
    };

    let bind = std::env::var("MERIDIAN_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(%bind, "Meridian sync server listening");

    axum::serve(listener, router(state)).await?;

    Ok(())
}
