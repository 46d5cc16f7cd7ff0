use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lumen_core::auth_guard::require_same_user;
use lumen_core::types::Principal;
use lumen_core::Result;

use crate::app::AppState;
use crate::types::{CandidateVisualization, Visualization, VisualizationStatus, VisualizationWithScenes};

pub async fn get_visualization(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<VisualizationWithScenes>> {
    let visualization = state.visualizations.get(&id)?;
    require_same_user(&principal, &visualization.visualization.user_id)?;
    Ok(Json(visualization))
}

pub async fn get_by_lesson(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(lesson_id): Path<String>,
) -> Result<Json<VisualizationWithScenes>> {
    let visualization = state.visualizations.get_by_lesson(&lesson_id)?;
    require_same_user(&principal, &visualization.visualization.user_id)?;
    Ok(Json(visualization))
}

pub async fn list(State(state): State<Arc<AppState>>, principal: Principal) -> Result<Json<Vec<Visualization>>> {
    Ok(Json(state.visualizations.list(&principal.user_id)?))
}

/// `POST /visualizations/process`: submits a candidate visualization through
/// the validate → resolve → reconcile → persist pipeline. A structurally
/// invalid candidate is still persisted (with `status: invalid`) but the
/// response itself is a 400, since nothing was created that the caller can
/// play back.
pub async fn process(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(candidate): Json<CandidateVisualization>,
) -> Result<Response> {
    let outcome = state.visualizations.process(&principal.user_id, candidate)?;
    let status = match outcome.visualization.status {
        VisualizationStatus::Ready => StatusCode::OK,
        VisualizationStatus::Invalid => StatusCode::BAD_REQUEST,
        VisualizationStatus::StoreFailed => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((status, Json(outcome)).into_response())
}
