use async_trait::async_trait;

use crate::provider::{GeneratedItem, GenerationRequest, GenerationResponse, GeneratorError, TextGenerator};

/// A deterministic, network-free generator used in tests and local
/// development. It chunks `source_text` into roughly even windows and turns
/// each into a titled section, rather than calling out to a real model.
///
/// Production deployments swap this for an HTTP-backed `TextGenerator` that
/// speaks to whatever provider the operator configures; the trait boundary
/// is what lets lesson and quiz generation stay provider-agnostic.
pub struct OfflineGenerator;

impl OfflineGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OfflineGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for OfflineGenerator {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(&self, req: &GenerationRequest) -> Result<GenerationResponse, GeneratorError> {
        let words: Vec<&str> = req.source_text.split_whitespace().collect();
        if words.is_empty() {
            return Err(GeneratorError::Empty);
        }

        let item_count = req.max_items.max(1) as usize;
        let chunk_size = words.len().div_ceil(item_count).max(1);

        let items: Vec<GeneratedItem> = words
            .chunks(chunk_size)
            .take(item_count)
            .enumerate()
            .map(|(i, chunk)| GeneratedItem {
                title: format!("Section {}", i + 1),
                body: chunk.join(" "),
            })
            .collect();

        Ok(GenerationResponse { items, model: "offline-chunker-v1".to_string() })
    }
}
