pub mod mailer;
pub mod offline;
pub mod provider;

pub use mailer::{LoggingMailer, Mailer, MailerError};
pub use offline::OfflineGenerator;
pub use provider::{GeneratedItem, GenerationRequest, GenerationResponse, GeneratorError, TextGenerator};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_generator_splits_into_requested_item_count() {
        let gen = OfflineGenerator::new();
        let req = GenerationRequest {
            instruction: "produce sections".into(),
            source_text: "one two three four five six seven eight".into(),
            max_items: 4,
        };
        let resp = gen.generate(&req).await.unwrap();
        assert_eq!(resp.items.len(), 4);
        assert_eq!(resp.items[0].title, "Section 1");
    }

    #[tokio::test]
    async fn offline_generator_rejects_empty_source() {
        let gen = OfflineGenerator::new();
        let req = GenerationRequest { instruction: "x".into(), source_text: "   ".into(), max_items: 3 };
        assert!(gen.generate(&req).await.is_err());
    }
}
