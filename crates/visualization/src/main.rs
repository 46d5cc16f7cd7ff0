use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lumen_bus::TOPIC_LESSON_READY;
use lumen_core::jwt::KeyRing;
use serde::Deserialize;
use tracing::info;

mod app;
mod db;
mod error;
mod geometry;
mod http;
mod manager;
mod types;

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(flatten)]
    service: lumen_core::config::ServiceConfig,
    jwt_keys: KeyRing,
    bus_database_path: String,
    lesson_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "lumen_visualization=info".into()),
        )
        .init();

    let config: Config = lumen_core::config::load("LUMEN_VISUALIZATION", None, "visualization.toml")?;

    let db_path = config
        .service
        .database_path
        .clone()
        .unwrap_or_else(|| format!("{}/visualization.sqlite3", lumen_core::config::data_dir("visualization")));
    let conn = lumen_core::db::open(&db_path)?;
    db::init_db(&conn)?;

    let bus_conn = lumen_core::db::open(&config.bus_database_path)?;
    let bus = lumen_bus::EventBus::new(bus_conn)?;

    let visualizations = manager::VisualizationManager::new(conn, bus.clone(), config.lesson_url, config.jwt_keys.clone());

    let consumer = Arc::clone(&visualizations);
    lumen_bus::spawn_polling_consumer(bus, "visualization", TOPIC_LESSON_READY, Duration::from_secs(2), move |event| {
        let visualizations = Arc::clone(&consumer);
        async move {
            let payload: lumen_bus::LessonReady = event.decode()?;
            visualizations.handle_lesson_ready(&payload.lesson_id, &payload.user_id).await
        }
    });

    let state = Arc::new(app::AppState { visualizations, keys: config.jwt_keys });
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.service.bind, config.service.port).parse()?;
    info!("visualization service listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
