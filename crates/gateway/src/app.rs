use std::sync::Arc;
use std::time::Duration;

use axum::routing::{any, get};
use axum::Router;

use crate::config::GatewayConfig;
use crate::health::HealthGate;

/// Central shared state — passed as `Arc<AppState>` to all handlers.
pub struct AppState {
    pub config: GatewayConfig,
    pub http: reqwest::Client,
    pub health: Arc<HealthGate>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(lumen_core::config::DEFAULT_REQUEST_DEADLINE_SECS))
            .build()
            .expect("reqwest client builds");

        Self { config, http, health: HealthGate::new() }
    }
}

/// Assemble the full Axum router. Every `/api/{service}/...` prefix is
/// reverse-proxied to the matching downstream service; `/ws/teaching` is
/// reverse-proxied to conversation's WebSocket endpoint.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/api/{service}/{*rest}", any(crate::proxy::proxy_handler))
        .route("/ws/teaching", get(crate::ws_proxy::ws_proxy_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
}
