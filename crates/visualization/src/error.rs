use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisualizationError {
    #[error("visualization not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("lesson has no sections to visualize")]
    EmptyLesson,

    #[error("failed to persist visualization: {0}")]
    StoreFailed(String),

    #[error("failed to mint service token: {0}")]
    Token(String),
}

pub type Result<T> = std::result::Result<T, VisualizationError>;

impl From<VisualizationError> for lumen_core::AppError {
    fn from(e: VisualizationError) -> Self {
        match e {
            VisualizationError::NotFound(_) => lumen_core::AppError::NotFound(e.to_string()),
            VisualizationError::Database(err) => lumen_core::AppError::from(err),
            VisualizationError::Upstream(err) => lumen_core::AppError::from(err),
            VisualizationError::EmptyLesson => lumen_core::AppError::Validation(e.to_string()),
            VisualizationError::StoreFailed(_) => lumen_core::AppError::Internal(e.to_string()),
            VisualizationError::Token(_) => lumen_core::AppError::Internal(e.to_string()),
        }
    }
}
