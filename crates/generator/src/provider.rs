use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A request to turn extracted document text into structured lesson content.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System-style instruction describing the shape of content wanted
    /// (e.g. "produce 4-8 lesson sections with a short narration each").
    pub instruction: String,
    /// The source text the generator should summarize/structure.
    pub source_text: String,
    /// Soft cap on the number of output sections/items requested.
    pub max_items: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedItem {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub items: Vec<GeneratedItem>,
    pub model: String,
}

/// Common interface for text generation backends.
///
/// Lesson generation, quiz generation and conversational replies all go
/// through this trait so the services never depend on a concrete LLM
/// integration directly.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, req: &GenerationRequest) -> Result<GenerationResponse, GeneratorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream generator error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("generator produced no usable content")]
    Empty,
}

impl From<GeneratorError> for lumen_core::AppError {
    fn from(e: GeneratorError) -> Self {
        match e {
            GeneratorError::Http(_) => lumen_core::AppError::UpstreamUnavailable(e.to_string()),
            GeneratorError::Upstream { .. } => lumen_core::AppError::UpstreamUnavailable(e.to_string()),
            GeneratorError::Empty => lumen_core::AppError::Internal(e.to_string()),
        }
    }
}
