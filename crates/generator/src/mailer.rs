use async_trait::async_trait;
use tracing::info;

/// Delivery of a one-time code or transactional notice. Auth depends on this
/// trait rather than a concrete SMTP/API integration.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, to_email: &str, code: &str) -> Result<(), MailerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

impl From<MailerError> for lumen_core::AppError {
    fn from(e: MailerError) -> Self {
        lumen_core::AppError::UpstreamUnavailable(e.to_string())
    }
}

/// Logs OTP codes instead of sending mail. Suitable for local development
/// and tests; a real deployment swaps in an SMTP- or API-backed `Mailer`.
pub struct LoggingMailer;

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send_otp(&self, to_email: &str, code: &str) -> Result<(), MailerError> {
        info!(%to_email, %code, "otp issued");
        Ok(())
    }
}
