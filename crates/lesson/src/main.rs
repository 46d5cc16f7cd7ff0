use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lumen_bus::TOPIC_DOCUMENT_INGESTED;
use lumen_core::jwt::KeyRing;
use serde::Deserialize;
use tracing::{info, warn};

mod app;
mod db;
mod error;
mod http;
mod manager;
mod types;

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(flatten)]
    service: lumen_core::config::ServiceConfig,
    jwt_keys: KeyRing,
    bus_database_path: String,
    ingestion_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "lumen_lesson=info".into()),
        )
        .init();

    let config: Config = lumen_core::config::load("LUMEN_LESSON", None, "lesson.toml")?;

    let db_path = config
        .service
        .database_path
        .clone()
        .unwrap_or_else(|| format!("{}/lesson.sqlite3", lumen_core::config::data_dir("lesson")));
    let conn = lumen_core::db::open(&db_path)?;
    db::init_db(&conn)?;

    let bus_conn = lumen_core::db::open(&config.bus_database_path)?;
    let bus = lumen_bus::EventBus::new(bus_conn)?;

    let generator = Arc::new(lumen_generator::OfflineGenerator::new());
    let lessons = manager::LessonManager::new(conn, bus.clone(), config.ingestion_url, generator, config.jwt_keys.clone());

    let consumer_lessons = Arc::clone(&lessons);
    lumen_bus::spawn_polling_consumer(bus, "lesson", TOPIC_DOCUMENT_INGESTED, Duration::from_secs(2), move |event| {
        let lessons = Arc::clone(&consumer_lessons);
        async move {
            let payload: lumen_bus::DocumentIngested = event.decode()?;
            lessons.handle_document_ingested(&payload.document_id, &payload.user_id).await
        }
    });

    let state = Arc::new(app::AppState { lessons, keys: config.jwt_keys });
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.service.bind, config.service.port).parse()?;
    info!("lesson service listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
