use thiserror::Error;

/// Errors that can occur while publishing or consuming bus events.
#[derive(Debug, Error)]
pub enum BusError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An event payload did not round-trip through JSON.
    #[error("payload serialization error: {0}")]
    Payload(#[from] serde_json::Error),

    /// A consumer tried to ack a cursor that moved backwards.
    #[error("cursor regression for consumer {consumer_group} on topic {topic}")]
    CursorRegression { consumer_group: String, topic: String },
}

pub type Result<T> = std::result::Result<T, BusError>;

impl From<BusError> for lumen_core::AppError {
    fn from(e: BusError) -> Self {
        match e {
            BusError::Database(e) => lumen_core::AppError::from(e),
            BusError::Payload(e) => lumen_core::AppError::from(e),
            BusError::CursorRegression { .. } => lumen_core::AppError::Internal(e.to_string()),
        }
    }
}
