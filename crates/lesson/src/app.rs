use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use lumen_core::auth_guard::HasKeyRing;
use lumen_core::jwt::KeyRing;

use crate::manager::LessonManager;

pub struct AppState {
    pub lessons: Arc<LessonManager>,
    pub keys: KeyRing,
}

impl HasKeyRing for AppState {
    fn key_ring(&self) -> &KeyRing {
        &self.keys
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/lessons", get(crate::http::list))
        .route("/lessons/{id}", get(crate::http::get_lesson).delete(crate::http::delete_lesson))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
