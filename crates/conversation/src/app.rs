use axum::routing::{delete, get, post};
use axum::Router;
use lumen_core::auth_guard::HasKeyRing;
use lumen_core::jwt::KeyRing;

use crate::manager::ConversationManager;

pub struct AppState {
    pub conversations: ConversationManager,
    pub http: reqwest::Client,
    pub visualization_url: String,
    pub keys: KeyRing,
}

impl HasKeyRing for AppState {
    fn key_ring(&self) -> &KeyRing {
        &self.keys
    }
}

pub fn build_router(state: std::sync::Arc<AppState>) -> Router {
    Router::new()
        .route("/conversations", get(crate::http::list).post(crate::http::create))
        .route("/conversations/{id}/rename", post(crate::http::rename))
        .route("/conversations/{id}", delete(crate::http::delete_conversation))
        .route("/conversations/{id}/attach-lesson", post(crate::http::attach_lesson))
        .route("/ws/teaching", get(crate::ws::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
