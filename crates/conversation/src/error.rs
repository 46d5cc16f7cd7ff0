use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("conversation not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ConversationError>;

impl From<ConversationError> for lumen_core::AppError {
    fn from(e: ConversationError) -> Self {
        match e {
            ConversationError::NotFound(_) => lumen_core::AppError::NotFound(e.to_string()),
            ConversationError::Database(err) => lumen_core::AppError::from(err),
            ConversationError::Upstream(err) => lumen_core::AppError::from(err),
        }
    }
}
