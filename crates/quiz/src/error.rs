use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("quiz not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("quiz generation failed: {0}")]
    Generation(String),

    #[error("answers reference an unknown question index")]
    InvalidAnswer,
}

pub type Result<T> = std::result::Result<T, QuizError>;

impl From<QuizError> for lumen_core::AppError {
    fn from(e: QuizError) -> Self {
        match e {
            QuizError::NotFound(_) => lumen_core::AppError::NotFound(e.to_string()),
            QuizError::Database(err) => lumen_core::AppError::from(err),
            QuizError::Upstream(err) => lumen_core::AppError::from(err),
            QuizError::Generation(_) => lumen_core::AppError::Internal(e.to_string()),
            QuizError::InvalidAnswer => lumen_core::AppError::Validation(e.to_string()),
        }
    }
}
