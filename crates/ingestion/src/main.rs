use std::net::SocketAddr;
use std::sync::Arc;

use lumen_core::jwt::KeyRing;
use serde::Deserialize;
use tracing::info;

mod app;
mod db;
mod error;
mod extractor;
mod http;
mod manager;
mod storage;
mod types;

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(flatten)]
    service: lumen_core::config::ServiceConfig,
    jwt_keys: KeyRing,
    bus_database_path: String,
    #[serde(default = "default_storage_dir")]
    storage_dir: String,
}

fn default_storage_dir() -> String {
    format!("{}/blobs", lumen_core::config::data_dir("ingestion"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "lumen_ingestion=info".into()),
        )
        .init();

    let config: Config = lumen_core::config::load("LUMEN_INGESTION", None, "ingestion.toml")?;

    let db_path = config
        .service
        .database_path
        .clone()
        .unwrap_or_else(|| format!("{}/ingestion.sqlite3", lumen_core::config::data_dir("ingestion")));
    let conn = lumen_core::db::open(&db_path)?;
    db::init_db(&conn)?;

    let bus_conn = lumen_core::db::open(&config.bus_database_path)?;
    let bus = lumen_bus::EventBus::new(bus_conn)?;

    let extractor: Arc<dyn extractor::Extractor> = Arc::new(extractor::PdfExtractor);
    let ingestion = manager::IngestionManager::new(conn, config.storage_dir, bus, extractor);

    let state = Arc::new(app::AppState { ingestion, keys: config.jwt_keys });
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.service.bind, config.service.port).parse()?;
    info!("ingestion service listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
