use crate::error::{IngestionError, Result};

/// Pulls plain text out of a stored document file. Kept as a trait so a
/// future OCR path (scanned PDFs, images) can be slotted in without
/// touching the worker loop that drives it.
pub trait Extractor: Send + Sync {
    fn extract(&self, storage_path: &str) -> Result<String>;
}

/// Extracts text from PDF files using a pure-Rust PDF parser. Non-PDF
/// uploads are read as plain UTF-8 text, which covers the common case of
/// lecture notes already exported as `.txt`/`.md`.
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn extract(&self, storage_path: &str) -> Result<String> {
        let text = if storage_path.to_lowercase().ends_with(".pdf") {
            pdf_extract::extract_text(storage_path).map_err(|e| IngestionError::Extraction(e.to_string()))?
        } else {
            std::fs::read_to_string(storage_path)?
        };

        if text.trim().is_empty() {
            return Err(IngestionError::Extraction("no text content found in document".into()));
        }
        Ok(text)
    }
}
