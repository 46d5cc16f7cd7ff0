use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use lumen_core::auth_guard::HasKeyRing;

use crate::manager::AuthManager;

pub struct AppState {
    pub auth: AuthManager,
}

impl HasKeyRing for AppState {
    fn key_ring(&self) -> &lumen_core::jwt::KeyRing {
        self.auth.key_ring()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/signup", post(crate::http::signup))
        .route("/login", post(crate::http::login))
        .route("/forgot-password", post(crate::http::forgot_password))
        .route("/verify-otp", post(crate::http::verify_otp))
        .route("/password-reset-confirm", post(crate::http::reset_password))
        .route("/token/refresh", post(crate::http::refresh))
        .route("/logout", post(crate::http::logout))
        .route("/verify-token", axum::routing::get(crate::http::me))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
