//! Per-job orchestration: extraction, analysis, persistence, notification.
//!
//! The processor owns a job from "queued" to a terminal state. Status is
//! written to the fast cache after every transition and the finished job is
//! upserted into the durable store. Only extraction failure is terminal;
//! cache and store write failures are logged and never block the job.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::{
    analysis,
    cache::{CacheExt, CacheKeys, JobCache},
    config::Config,
    db::JobStore,
    events::AnalysisTrigger,
    extraction::{ExtractError, ExtractedDocument, ExtractionPipeline},
    models::{ProcessingJob, ProcessingResult, RiskAnalysis},
};

/// How long a job status entry stays readable in the cache.
pub const JOB_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Bound on any single status write, so a slow cache cannot stall a job.
pub const STATUS_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to process file: {0}")]
    Extraction(#[from] ExtractError),
}

/// Upload constraints enforced before parsing begins.
#[derive(Debug, Clone)]
pub struct ProcessingLimits {
    pub max_file_size: u64,
    pub allowed_types: Vec<String>,
}

impl ProcessingLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_file_size: config.max_file_size,
            allowed_types: config.allowed_types.clone(),
        }
    }

    fn check(&self, path: &Path, size: u64) -> Result<(), ExtractError> {
        if size > self.max_file_size {
            return Err(ExtractError::FileTooLarge {
                size,
                limit: self.max_file_size,
            });
        }
        let mime = mime_for_path(path);
        if !self.allowed_types.iter().any(|t| t == mime) {
            return Err(ExtractError::UnsupportedType(mime.to_string()));
        }
        Ok(())
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

pub struct DocumentProcessor {
    cache: Arc<dyn JobCache>,
    store: Arc<dyn JobStore>,
    pipeline: ExtractionPipeline,
    trigger: Arc<dyn AnalysisTrigger>,
    limits: ProcessingLimits,
}

impl DocumentProcessor {
    pub fn new(
        cache: Arc<dyn JobCache>,
        store: Arc<dyn JobStore>,
        pipeline: ExtractionPipeline,
        trigger: Arc<dyn AnalysisTrigger>,
        limits: ProcessingLimits,
    ) -> Self {
        Self {
            cache,
            store,
            pipeline,
            trigger,
            limits,
        }
    }

    /// Run one job to a terminal state.
    ///
    /// On pipeline failure the job is marked failed and persisted before the
    /// error is returned; callers must not treat the error as a pool-level
    /// failure. On success the job carries the result and has been upserted
    /// into the durable store (best-effort).
    #[tracing::instrument(skip_all, fields(job_id = %job.id, tender_id = %job.tender_id))]
    pub async fn process_document(&self, job: &mut ProcessingJob) -> Result<(), ProcessError> {
        let started = Instant::now();

        job.mark_processing();
        self.persist_status(job).await;

        let mut result = match self.run_pipeline(job).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "pipeline failed");
                job.mark_failed(e.to_string());
                self.persist_status(job).await;
                return Err(e);
            }
        };

        result.processing_time_ms = started.elapsed().as_millis() as u64;
        job.mark_completed(result);
        self.persist_status(job).await;

        if let Err(e) = self.store.upsert_job(job).await {
            tracing::warn!(error = %e, "failed to store job results");
        }

        if job.options.wants_analysis() {
            let trigger = Arc::clone(&self.trigger);
            let job_id = job.id;
            // Unawaited by design; delivery is best-effort, at-most-once.
            tokio::spawn(async move {
                trigger.job_ready(job_id).await;
            });
        }

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "job completed"
        );
        Ok(())
    }

    async fn run_pipeline(&self, job: &ProcessingJob) -> Result<ProcessingResult, ProcessError> {
        let path = Path::new(&job.file_path);

        let file_size = tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        self.limits.check(path, file_size)?;

        let doc = self.pipeline.run(path, &job.options).await?;

        Ok(self.analyze(job, doc, file_size))
    }

    fn analyze(
        &self,
        job: &ProcessingJob,
        doc: ExtractedDocument,
        file_size: u64,
    ) -> ProcessingResult {
        let quality_metrics = analysis::quality_metrics(&doc.text, doc.page_count, doc.ocr_confidence);

        let entities = if job.options.extract_entities {
            analysis::extract_entities(&doc.text, &doc.page_offsets)
        } else {
            Vec::new()
        };

        let risk_analysis = if job.options.analyze_risks {
            analysis::analyze_risks(&doc.text)
        } else {
            RiskAnalysis::default()
        };

        let relevance_score = if job.options.generate_score {
            analysis::relevance_score(&doc.text)
        } else {
            0.0
        };

        ProcessingResult {
            extracted_text: doc.text,
            page_count: doc.page_count,
            file_size,
            processing_time_ms: 0,
            entities,
            risk_analysis,
            relevance_score,
            quality_metrics,
            metadata: HashMap::new(),
        }
    }

    /// Write the job's current state to the fast cache. Best-effort: a slow
    /// or failing cache is logged and otherwise ignored.
    pub(crate) async fn persist_status(&self, job: &ProcessingJob) {
        let key = CacheKeys::job(job.id);
        match tokio::time::timeout(
            STATUS_WRITE_TIMEOUT,
            self.cache.set_json(&key, job, JOB_TTL),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(job_id = %job.id, error = %e, "failed to update job status");
            }
            Err(_) => {
                tracing::warn!(job_id = %job.id, "job status write timed out");
            }
        }
    }
}
