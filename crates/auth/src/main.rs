use std::net::SocketAddr;
use std::sync::Arc;

use lumen_core::jwt::KeyRing;
use serde::Deserialize;
use tracing::info;

mod app;
mod db;
mod error;
mod http;
mod manager;
mod otp;
mod password;
mod types;

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(flatten)]
    service: lumen_core::config::ServiceConfig,
    jwt_keys: KeyRing,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "lumen_auth=info".into()),
        )
        .init();

    let config: Config = lumen_core::config::load("LUMEN_AUTH", None, "auth.toml")?;
    let db_path = config
        .service
        .database_path
        .clone()
        .unwrap_or_else(|| format!("{}/auth.sqlite3", lumen_core::config::data_dir("auth")));
    let conn = lumen_core::db::open(&db_path)?;
    db::init_db(&conn)?;

    let mailer = Arc::new(lumen_generator::LoggingMailer);
    let auth = manager::AuthManager::new(conn, config.jwt_keys, mailer);
    let state = Arc::new(app::AppState { auth });
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.service.bind, config.service.port).parse()?;
    info!("auth service listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
