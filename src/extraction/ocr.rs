use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::config::OcrConfig;

/// Mean confidence assumed when the engine's confidence output cannot be
/// parsed. The value is in percent; callers normalize to [0, 1].
pub const DEFAULT_MEAN_CONFIDENCE: f64 = 85.0;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("ocr engine failed: {0}")]
    Engine(String),

    #[error("failed to run ocr engine: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    /// Mean word confidence in percent, when the engine reported one that
    /// parsed cleanly.
    pub mean_confidence: Option<f64>,
}

/// Optical character recognition over a document or image file.
///
/// A blocking, single-shot call; retry policy belongs to the caller's
/// caller (the pipeline treats failure as non-fatal and moves on).
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(
        &self,
        path: &Path,
        languages: &[String],
        dpi: u32,
    ) -> Result<OcrOutput, OcrError>;
}

/// OCR engine shelling out to the `tesseract` CLI.
///
/// Text comes from a plain `stdout` run; mean confidence from a second TSV
/// run. Confidence-parse failures are swallowed into `None` so a flaky TSV
/// never fails a recognition that produced text.
pub struct TesseractOcr {
    defaults: OcrConfig,
}

impl TesseractOcr {
    pub fn new(defaults: OcrConfig) -> Self {
        Self { defaults }
    }

    fn language_spec(&self, languages: &[String]) -> String {
        // Caller-supplied languages take precedence over service defaults.
        let langs: &[String] = if languages.is_empty() {
            &self.defaults.languages
        } else {
            languages
        };
        if langs.is_empty() {
            "por+eng".to_string()
        } else {
            langs.join("+")
        }
    }

    async fn mean_confidence(&self, path: &Path, lang: &str, dpi: u32) -> Option<f64> {
        let mut cmd = Command::new("tesseract");
        cmd.arg(path).arg("stdout").arg("-l").arg(lang);
        if dpi > 0 {
            cmd.arg("--dpi").arg(dpi.to_string());
        }
        cmd.arg("tsv");

        let output = cmd.output().await.ok()?;
        if !output.status.success() {
            return None;
        }

        parse_mean_confidence(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Mean of the word-level `conf` column of tesseract TSV output. Rows with
/// conf -1 are structural (page/block/line) and are skipped.
fn parse_mean_confidence(tsv: &str) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;

    for line in tsv.lines().skip(1) {
        let Some(conf) = line.split('\t').nth(10) else {
            continue;
        };
        let Ok(conf) = conf.parse::<f64>() else {
            continue;
        };
        if conf >= 0.0 {
            sum += conf;
            count += 1;
        }
    }

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    async fn recognize(
        &self,
        path: &Path,
        languages: &[String],
        dpi: u32,
    ) -> Result<OcrOutput, OcrError> {
        let lang = self.language_spec(languages);
        let dpi = if dpi > 0 { dpi } else { self.defaults.dpi };

        let mut cmd = Command::new("tesseract");
        cmd.arg(path).arg("stdout").arg("-l").arg(&lang);
        if dpi > 0 {
            cmd.arg("--dpi").arg(dpi.to_string());
        }

        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(OcrError::Engine(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        let mean_confidence = self.mean_confidence(path, &lang, dpi).await;

        tracing::debug!(
            lang = %lang,
            text_len = text.len(),
            confidence = ?mean_confidence,
            "ocr recognition finished"
        );

        Ok(OcrOutput {
            text,
            mean_confidence,
        })
    }
}
