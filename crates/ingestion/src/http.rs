use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use lumen_core::types::Principal;
use lumen_core::{AppError, Result};

use crate::app::AppState;
use crate::types::Document;

pub async fn upload(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    mut multipart: Multipart,
) -> Result<Json<Document>> {
    let mut title: Option<String> = None;
    let mut filename = "upload.bin".to_string();
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::validation(e.to_string()))? {
        match field.name().unwrap_or_default() {
            "title" => {
                title = Some(field.text().await.map_err(|e| AppError::validation(e.to_string()))?);
            }
            "file" => {
                filename = field.file_name().unwrap_or("upload.bin").to_string();
                bytes = Some(field.bytes().await.map_err(|e| AppError::validation(e.to_string()))?.to_vec());
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| AppError::validation("multipart request is missing a 'file' field"))?;
    let title = title.unwrap_or_else(|| filename.clone());

    let doc = state.ingestion.upload(&principal.user_id, &title, &filename, &bytes)?;
    Ok(Json(doc))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Document>> {
    let doc = state.ingestion.get(&id)?;
    lumen_core::auth_guard::require_same_user(&principal, &doc.user_id)?;
    Ok(Json(doc))
}

pub async fn list(State(state): State<Arc<AppState>>, principal: Principal) -> Result<Json<Vec<Document>>> {
    Ok(Json(state.ingestion.list(&principal.user_id)?))
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let doc = state.ingestion.get(&id)?;
    lumen_core::auth_guard::require_same_user(&principal, &doc.user_id)?;
    state.ingestion.stop(&id)?;
    Ok(Json(serde_json::json!({ "stopped": true })))
}
