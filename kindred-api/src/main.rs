use std::sync::Arc;

use kindred_api::config::{AppConfig, StoreBackend};
use kindred_api::store::{MemoryStore, PgStore, Store};
use kindred_api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kindred_shared::middleware::init_tracing("kindred-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let store: Arc<dyn Store> = match config.store {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => Arc::new(PgStore::connect(&config.database_url, config.db_pool_size)?),
    };

    let metrics = if config.metrics_enabled {
        Some(kindred_shared::middleware::init_metrics()?)
    } else {
        None
    };

    let state = Arc::new(AppState { store, config, metrics });
    let app = kindred_api::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "kindred-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
