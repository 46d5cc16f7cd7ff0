use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lumen_core::auth_guard::require_same_user;
use lumen_core::types::Principal;
use lumen_core::Result;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::types::{Answer, QuizStatus};

pub async fn get_quiz(State(state): State<Arc<AppState>>, principal: Principal, Path(lesson_id): Path<String>) -> Result<Response> {
    let quiz = state.quizzes.get(&lesson_id)?;
    require_same_user(&principal, &quiz.user_id)?;

    if quiz.status == QuizStatus::Pending {
        #[derive(Serialize)]
        struct Generating {
            status: &'static str,
            retry_after_ms: u64,
        }
        return Ok((StatusCode::ACCEPTED, Json(Generating { status: "generating", retry_after_ms: 1_500 })).into_response());
    }

    Ok(Json(quiz).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub answers: Vec<Answer>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub score: u32,
    pub total: u32,
    pub details: Vec<crate::types::SubmissionResult>,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(lesson_id): Path<String>,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>> {
    let quiz = state.quizzes.get(&lesson_id)?;
    require_same_user(&principal, &quiz.user_id)?;
    let (submission, details) = state.quizzes.submit(&lesson_id, &principal.user_id, body.answers)?;
    Ok(Json(SubmitResponse { score: submission.score, total: submission.total, details }))
}
