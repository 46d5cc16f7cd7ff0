use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account not found: {0}")]
    NotFound(String),

    #[error("an account with email {0} already exists")]
    AlreadyExists(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("one-time code is invalid or has expired")]
    InvalidOtp,

    #[error("refresh token is invalid, expired or revoked")]
    InvalidRefreshToken,

    #[error("password does not meet policy: {0}")]
    WeakPassword(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to issue access token: {0}")]
    TokenIssue(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl From<AuthError> for lumen_core::AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NotFound(_) => lumen_core::AppError::NotFound(e.to_string()),
            AuthError::AlreadyExists(_) => lumen_core::AppError::Conflict(e.to_string()),
            AuthError::InvalidCredentials | AuthError::InvalidOtp | AuthError::InvalidRefreshToken => {
                lumen_core::AppError::Auth(e.to_string())
            }
            AuthError::WeakPassword(_) => lumen_core::AppError::Validation(e.to_string()),
            AuthError::Database(err) => lumen_core::AppError::from(err),
            AuthError::TokenIssue(_) => lumen_core::AppError::Internal(e.to_string()),
            AuthError::Hashing(_) => lumen_core::AppError::Internal(e.to_string()),
        }
    }
}
