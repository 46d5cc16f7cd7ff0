use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

mod app;
mod config;
mod health;
mod http;
mod proxy;
mod ws_proxy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumen_gateway=info,tower_http=debug".into()),
        )
        .init();

    let gateway_config = config::GatewayConfig::load()?;
    let bind = gateway_config.bind.clone();
    let port = gateway_config.port;

    let state = Arc::new(app::AppState::new(gateway_config));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
