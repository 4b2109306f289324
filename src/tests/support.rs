//! Scripted collaborators for pipeline and pool tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::{
    cache::{CacheError, CacheResult, JobCache, MemoryCache},
    db::{DbError, DbResult, JobStore, MemoryJobStore},
    events::AnalysisTrigger,
    extraction::{
        ExtractError, Extraction, ExtractionPipeline, OcrEngine, OcrError, OcrOutput,
        TextExtractor,
    },
    models::ProcessingJob,
    processor::{DocumentProcessor, ProcessingLimits},
};

/// Returns the same text and page count for every document.
pub struct StaticExtractor {
    pub text: String,
    pub pages: usize,
}

#[async_trait]
impl TextExtractor for StaticExtractor {
    async fn extract(&self, _path: &Path, _max_pages: usize) -> Result<Extraction, ExtractError> {
        Ok(Extraction {
            text: self.text.clone(),
            page_count: self.pages,
            page_offsets: if self.pages > 0 { vec![0] } else { Vec::new() },
        })
    }
}

/// Always fails to open the document, like a corrupted upload.
pub struct FailingExtractor;

#[async_trait]
impl TextExtractor for FailingExtractor {
    async fn extract(&self, _path: &Path, _max_pages: usize) -> Result<Extraction, ExtractError> {
        Err(ExtractError::Open("corrupted document".into()))
    }
}

/// Signals `started` when extraction begins and blocks until `release`
/// hands out a permit. Lets tests hold jobs in flight deterministically.
pub struct GatedExtractor {
    pub text: String,
    pub pages: usize,
    pub started: Arc<Semaphore>,
    pub release: Arc<Semaphore>,
}

impl GatedExtractor {
    pub fn new(text: impl Into<String>, pages: usize) -> (Self, Arc<Semaphore>, Arc<Semaphore>) {
        let started = Arc::new(Semaphore::new(0));
        let release = Arc::new(Semaphore::new(0));
        (
            Self {
                text: text.into(),
                pages,
                started: Arc::clone(&started),
                release: Arc::clone(&release),
            },
            started,
            release,
        )
    }
}

#[async_trait]
impl TextExtractor for GatedExtractor {
    async fn extract(&self, _path: &Path, _max_pages: usize) -> Result<Extraction, ExtractError> {
        self.started.add_permits(1);
        let permit = self
            .release
            .acquire()
            .await
            .map_err(|e| ExtractError::Internal(e.to_string()))?;
        permit.forget();
        Ok(Extraction {
            text: self.text.clone(),
            page_count: self.pages,
            page_offsets: vec![0],
        })
    }
}

/// OCR engine returning scripted output and counting invocations.
pub struct StaticOcr {
    pub text: String,
    pub confidence: Option<f64>,
    pub calls: AtomicUsize,
}

impl StaticOcr {
    pub fn new(text: impl Into<String>, confidence: Option<f64>) -> Self {
        Self {
            text: text.into(),
            confidence,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for StaticOcr {
    async fn recognize(
        &self,
        _path: &Path,
        _languages: &[String],
        _dpi: u32,
    ) -> Result<OcrOutput, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(OcrOutput {
            text: self.text.clone(),
            mean_confidence: self.confidence,
        })
    }
}

/// OCR engine that always fails, for degraded-path tests.
pub struct FailingOcr;

#[async_trait]
impl OcrEngine for FailingOcr {
    async fn recognize(
        &self,
        _path: &Path,
        _languages: &[String],
        _dpi: u32,
    ) -> Result<OcrOutput, OcrError> {
        Err(OcrError::Engine("no text detected".into()))
    }
}

/// Cache whose writes always fail, for persistence-failure tests.
pub struct FailingCache;

#[async_trait]
impl JobCache for FailingCache {
    async fn get_bytes(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(CacheError::Internal("cache down".into()))
    }

    async fn set_bytes(&self, _key: &str, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Internal("cache down".into()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::Internal("cache down".into()))
    }
}

/// Store whose upserts always fail.
pub struct FailingStore;

#[async_trait]
impl JobStore for FailingStore {
    async fn upsert_job(&self, _job: &ProcessingJob) -> DbResult<()> {
        Err(DbError::Internal("store down".into()))
    }
}

/// Records which job ids were announced to the analysis engine.
#[derive(Default)]
pub struct RecordingTrigger {
    received: Mutex<Vec<Uuid>>,
}

impl RecordingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<Uuid> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl AnalysisTrigger for RecordingTrigger {
    async fn job_ready(&self, job_id: Uuid) {
        self.received.lock().push(job_id);
    }
}

pub fn test_limits() -> ProcessingLimits {
    ProcessingLimits {
        max_file_size: 50 * 1024 * 1024,
        allowed_types: vec!["application/pdf".to_string()],
    }
}

/// Wire a processor from scripted collaborators with sensible defaults.
pub struct ProcessorBuilder {
    extractor: Arc<dyn TextExtractor>,
    ocr: Arc<dyn OcrEngine>,
    cache: Arc<dyn JobCache>,
    store: Arc<dyn JobStore>,
    trigger: Arc<dyn AnalysisTrigger>,
    limits: ProcessingLimits,
}

impl ProcessorBuilder {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            extractor,
            ocr: Arc::new(StaticOcr::new("", None)),
            cache: Arc::new(MemoryCache::new()),
            store: Arc::new(MemoryJobStore::new()),
            trigger: Arc::new(RecordingTrigger::new()),
            limits: test_limits(),
        }
    }

    pub fn ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = ocr;
        self
    }

    pub fn cache(mut self, cache: Arc<dyn JobCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = store;
        self
    }

    pub fn trigger(mut self, trigger: Arc<dyn AnalysisTrigger>) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn limits(mut self, limits: ProcessingLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn build(self) -> Arc<DocumentProcessor> {
        let pipeline = ExtractionPipeline::new(self.extractor, self.ocr);
        Arc::new(DocumentProcessor::new(
            self.cache,
            self.store,
            pipeline,
            self.trigger,
            self.limits,
        ))
    }
}

/// A page's worth of unremarkable contract text with no risk keywords.
pub fn clean_text() -> String {
    "The supplier shall deliver all items listed in annex two within the \
     agreed schedule and report progress to the contracting authority. "
        .repeat(4)
}
