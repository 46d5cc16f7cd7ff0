use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("uploaded file was empty or unreadable")]
    EmptyUpload,

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, IngestionError>;

impl From<IngestionError> for lumen_core::AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::NotFound(_) => lumen_core::AppError::NotFound(e.to_string()),
            IngestionError::EmptyUpload => lumen_core::AppError::Validation(e.to_string()),
            IngestionError::Extraction(_) => lumen_core::AppError::Internal(e.to_string()),
            IngestionError::Storage(_) => lumen_core::AppError::Internal(e.to_string()),
            IngestionError::Database(err) => lumen_core::AppError::from(err),
        }
    }
}
