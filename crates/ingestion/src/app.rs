use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use lumen_core::auth_guard::HasKeyRing;
use lumen_core::jwt::KeyRing;

use crate::manager::IngestionManager;

pub struct AppState {
    pub ingestion: Arc<IngestionManager>,
    pub keys: KeyRing,
}

impl HasKeyRing for AppState {
    fn key_ring(&self) -> &KeyRing {
        &self.keys
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/documents", post(crate::http::upload).get(crate::http::list))
        .route("/documents/{id}", get(crate::http::get_document))
        .route("/documents/{id}/stop", post(crate::http::stop))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
