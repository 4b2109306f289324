use std::path::Path;

use async_trait::async_trait;

use super::{ExtractError, Extraction, TextExtractor};

/// PDF container parser backed by `lopdf`.
///
/// Parsing is CPU-bound and synchronous, so it runs on the blocking thread
/// pool. Unreadable pages are skipped with a warning rather than aborting
/// the job; only a document that cannot be opened at all is an error.
#[derive(Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, path: &Path, max_pages: usize) -> Result<Extraction, ExtractError> {
        let path = path.to_owned();
        tokio::task::spawn_blocking(move || extract_blocking(&path, max_pages))
            .await
            .map_err(|e| ExtractError::Internal(e.to_string()))?
    }
}

fn extract_blocking(path: &Path, max_pages: usize) -> Result<Extraction, ExtractError> {
    let doc = lopdf::Document::load(path).map_err(|e| ExtractError::Open(e.to_string()))?;

    let pages = doc.get_pages();
    let page_count = pages.len();
    let limit = if max_pages == 0 {
        page_count
    } else {
        page_count.min(max_pages)
    };

    let mut text = String::new();
    let mut page_offsets = Vec::with_capacity(limit);

    for (&number, _) in pages.iter().take(limit) {
        page_offsets.push(text.len());
        match doc.extract_text(&[number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                tracing::warn!(page = number, error = %e, "skipping unreadable page");
            }
        }
    }

    Ok(Extraction {
        text,
        page_count,
        page_offsets,
    })
}
