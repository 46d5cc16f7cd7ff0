use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use lumen_core::auth_guard::require_same_user;
use lumen_core::types::Principal;
use lumen_core::Result;
use serde::Deserialize;

use crate::app::AppState;
use crate::types::Conversation;

pub async fn list(State(state): State<Arc<AppState>>, principal: Principal) -> Result<Json<Vec<Conversation>>> {
    Ok(Json(state.conversations.list(&principal.user_id)?))
}

pub async fn create(State(state): State<Arc<AppState>>, principal: Principal) -> Result<Json<Conversation>> {
    Ok(Json(state.conversations.create(&principal.user_id)?))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

pub async fn rename(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
    Json(body): Json<RenameRequest>,
) -> Result<Json<Conversation>> {
    let conversation = state.conversations.get(&id)?;
    require_same_user(&principal, &conversation.user_id)?;
    Ok(Json(state.conversations.rename(&id, &body.title)?))
}

pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let conversation = state.conversations.get(&id)?;
    require_same_user(&principal, &conversation.user_id)?;
    state.conversations.delete(&id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct AttachLessonRequest {
    pub lesson_id: String,
}

pub async fn attach_lesson(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
    Json(body): Json<AttachLessonRequest>,
) -> Result<Json<Conversation>> {
    let conversation = state.conversations.get(&id)?;
    require_same_user(&principal, &conversation.user_id)?;
    Ok(Json(state.conversations.attach_lesson(&id, &body.lesson_id)?))
}
