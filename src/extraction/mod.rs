//! Text extraction pipeline: direct container parsing with OCR fallback.
//!
//! Direct extraction runs first. When it yields too little text, or text
//! dominated by OCR-failure placeholder glyphs, and the job enables OCR,
//! the OCR engine re-derives text from the document. The longer of the two
//! texts wins. OCR failure is never fatal; the pipeline proceeds with
//! whatever direct text exists.

mod ocr;
mod pdf;

pub use ocr::{OcrEngine, OcrError, OcrOutput, TesseractOcr, DEFAULT_MEAN_CONFIDENCE};
pub use pdf::PdfTextExtractor;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ProcessingOptions;

/// Direct text under this many bytes triggers the OCR fallback.
const MIN_DIRECT_TEXT_LEN: usize = 100;

/// Placeholder-glyph share of the text above which direct extraction is
/// considered garbage.
const MAX_PLACEHOLDER_RATIO: f64 = 0.1;

/// Glyphs that extraction backends emit for characters they cannot map.
const PLACEHOLDER_GLYPHS: [char; 3] = ['□', '◯', '●'];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to open document: {0}")]
    Open(String),

    #[error("unsupported document type: {0}")]
    UnsupportedType(String),

    #[error("file exceeds maximum size ({size} > {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Per-page direct extraction output.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Page texts concatenated with newline separators.
    pub text: String,
    /// True page count of the container, independent of any page limit.
    pub page_count: usize,
    /// Byte offset in `text` where each parsed page begins.
    pub page_offsets: Vec<usize>,
}

/// Parses a document container into per-page plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path, max_pages: usize) -> Result<Extraction, ExtractError>;
}

/// Final text plus provenance, handed to the analyzer.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub page_count: usize,
    /// Empty when the final text came from OCR.
    pub page_offsets: Vec<usize>,
    /// Mean OCR confidence normalized to [0, 1]. Set whenever OCR ran,
    /// even when its text lost the length tie-break; `None` when OCR did
    /// not run.
    pub ocr_confidence: Option<f64>,
}

pub struct ExtractionPipeline {
    extractor: Arc<dyn TextExtractor>,
    ocr: Arc<dyn OcrEngine>,
}

impl ExtractionPipeline {
    pub fn new(extractor: Arc<dyn TextExtractor>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { extractor, ocr }
    }

    /// Run direct extraction, the quality gate, and the OCR fallback.
    ///
    /// Only direct-extraction failure is an error; it fails the whole job.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub async fn run(
        &self,
        path: &Path,
        options: &ProcessingOptions,
    ) -> Result<ExtractedDocument, ExtractError> {
        let direct = self.extractor.extract(path, options.max_pages).await?;

        let mut doc = ExtractedDocument {
            text: direct.text,
            page_count: direct.page_count,
            page_offsets: direct.page_offsets,
            ocr_confidence: None,
        };

        if options.enable_ocr && needs_ocr(&doc.text) {
            match self
                .ocr
                .recognize(path, &options.languages, options.dpi)
                .await
            {
                Ok(output) => {
                    let confidence = output.mean_confidence.unwrap_or(DEFAULT_MEAN_CONFIDENCE);
                    doc.ocr_confidence = Some((confidence / 100.0).clamp(0.0, 1.0));
                    // Longer text wins; a deterministic tie-break.
                    if output.text.len() > doc.text.len() {
                        tracing::debug!(
                            direct_len = doc.text.len(),
                            ocr_len = output.text.len(),
                            "ocr text replaces direct extraction"
                        );
                        doc.text = output.text;
                        doc.page_offsets.clear();
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "ocr fallback failed, keeping direct text");
                }
            }
        }

        Ok(doc)
    }
}

/// Quality gate: too little direct text, or too many placeholder glyphs.
pub fn needs_ocr(text: &str) -> bool {
    if text.len() < MIN_DIRECT_TEXT_LEN {
        return true;
    }
    let placeholders = text
        .chars()
        .filter(|c| PLACEHOLDER_GLYPHS.contains(c))
        .count();
    // Glyph occurrences over byte length.
    placeholders as f64 / text.len() as f64 > MAX_PLACEHOLDER_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_needs_ocr() {
        assert!(needs_ocr(""));
        assert!(needs_ocr("short scan artifact"));
    }

    #[test]
    fn long_clean_text_does_not_need_ocr() {
        let text = "a legible paragraph of contract text ".repeat(10);
        assert!(!needs_ocr(&text));
    }

    #[test]
    fn placeholder_heavy_text_needs_ocr() {
        // 40 placeholder glyphs over 280 bytes: ratio ~0.14.
        let mut text = "x".repeat(160);
        text.push_str(&"□".repeat(40));
        assert!(needs_ocr(&text));

        // Only a sprinkling of placeholders is fine.
        let mut text = "x".repeat(195);
        text.push_str(&"□".repeat(5));
        assert!(!needs_ocr(&text));
    }

    #[test]
    fn placeholder_ratio_counts_glyph_occurrences_over_bytes() {
        // 12 glyphs in 136 bytes (each glyph is 3 bytes): ratio ~0.088,
        // under the threshold even though the per-char ratio would exceed it.
        let mut text = "x".repeat(100);
        text.push_str(&"□".repeat(12));
        assert!(!needs_ocr(&text));
    }
}
