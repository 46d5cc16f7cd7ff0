use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use lumen_core::types::Principal;
use lumen_core::Result;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::manager::Session;
use crate::types::User;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self { user: s.user, access_token: s.access_token, refresh_token: s.refresh_token }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<SessionResponse>> {
    let session = state.auth.signup(&req.email, &req.name, &req.password)?;
    Ok(Json(session.into()))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let session = state.auth.login(&req.email, &req.password)?;
    Ok(Json(session.into()))
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

/// Recovery-flow code check. Does not log the caller in — the code is
/// actually consumed when `reset_password` runs.
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<serde_json::Value>> {
    state.auth.verify_otp(&req.email, &req.code)?;
    Ok(Json(serde_json::json!({ "valid": true })))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<serde_json::Value>> {
    state.auth.forgot_password(&req.email).await?;
    Ok(Json(serde_json::json!({ "sent": true })))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    state.auth.reset_password(&req.email, &req.code, &req.new_password)?;
    Ok(Json(serde_json::json!({ "reset": true })))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<SessionResponse>> {
    let session = state.auth.refresh(&req.refresh_token)?;
    Ok(Json(session.into()))
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<serde_json::Value>> {
    state.auth.logout(&req.refresh_token)?;
    Ok(Json(serde_json::json!({ "logged_out": true })))
}

pub async fn me(State(state): State<Arc<AppState>>, principal: Principal) -> Result<Json<User>> {
    let user = state.auth.get_user(&principal.user_id)?;
    Ok(Json(user))
}
