use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use lumen_core::auth_guard::HasKeyRing;
use lumen_core::jwt::KeyRing;

use crate::manager::QuizManager;

pub struct AppState {
    pub quizzes: Arc<QuizManager>,
    pub keys: KeyRing,
}

impl HasKeyRing for AppState {
    fn key_ring(&self) -> &KeyRing {
        &self.keys
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/quiz/{lesson_id}", get(crate::http::get_quiz))
        .route("/quiz/{lesson_id}/submit", post(crate::http::submit))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
