use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use lumen_core::auth_guard::require_same_user;
use lumen_core::types::Principal;
use lumen_core::Result;

use crate::app::AppState;
use crate::types::{Lesson, LessonWithSections};

pub async fn get_lesson(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<LessonWithSections>> {
    let lesson = state.lessons.get(&id)?;
    require_same_user(&principal, &lesson.lesson.user_id)?;
    Ok(Json(lesson))
}

pub async fn list(State(state): State<Arc<AppState>>, principal: Principal) -> Result<Json<Vec<Lesson>>> {
    Ok(Json(state.lessons.list(&principal.user_id)?))
}

pub async fn delete_lesson(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let lesson = state.lessons.get(&id)?;
    require_same_user(&principal, &lesson.lesson.user_id)?;
    state.lessons.delete(&id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
