use thiserror::Error;

#[derive(Debug, Error)]
pub enum LessonError {
    #[error("lesson not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("text generation failed: {0}")]
    Generation(String),
}

pub type Result<T> = std::result::Result<T, LessonError>;

impl From<LessonError> for lumen_core::AppError {
    fn from(e: LessonError) -> Self {
        match e {
            LessonError::NotFound(_) => lumen_core::AppError::NotFound(e.to_string()),
            LessonError::Database(err) => lumen_core::AppError::from(err),
            LessonError::Upstream(err) => lumen_core::AppError::from(err),
            LessonError::Generation(_) => lumen_core::AppError::Internal(e.to_string()),
        }
    }
}
