use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use lumen_core::auth_guard::HasKeyRing;
use lumen_core::jwt::KeyRing;

use crate::manager::VisualizationManager;

pub struct AppState {
    pub visualizations: Arc<VisualizationManager>,
    pub keys: KeyRing,
}

impl HasKeyRing for AppState {
    fn key_ring(&self) -> &KeyRing {
        &self.keys
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/visualizations", get(crate::http::list))
        .route("/visualizations/process", post(crate::http::process))
        .route("/visualizations/{id}", get(crate::http::get_visualization))
        .route("/visualizations/by-lesson/{lesson_id}", get(crate::http::get_by_lesson))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
