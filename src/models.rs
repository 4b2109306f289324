//! Core data model for document processing jobs.
//!
//! A [`ProcessingJob`] is the unit of work tracked through the pipeline.
//! It is created by the API layer, queued on the worker pool, and mutated
//! exclusively by the document processor while it runs. The serialized form
//! matches what the fast cache stores under `job:<id>` and what downstream
//! consumers poll.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a processing job. Transitions only move forward:
/// `Queued -> Processing -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-job processing options supplied at submission time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Run OCR when direct extraction yields insufficient text.
    #[serde(default)]
    pub enable_ocr: bool,
    /// OCR language codes (tesseract names, e.g. "por", "eng").
    /// Empty means the engine's locale defaults.
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub extract_entities: bool,
    #[serde(default)]
    pub analyze_risks: bool,
    #[serde(default)]
    pub generate_score: bool,
    /// Maximum pages to parse; 0 means no limit.
    #[serde(default)]
    pub max_pages: usize,
    /// OCR rendering resolution; 0 means the engine default.
    #[serde(default)]
    pub dpi: u32,
}

impl ProcessingOptions {
    /// Whether any downstream analysis stage was requested. Controls the
    /// fire-and-forget analysis trigger after completion.
    pub fn wants_analysis(&self) -> bool {
        self.extract_entities || self.analyze_risks || self.generate_score
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub id: Uuid,
    /// Path to the uploaded document on shared storage.
    pub file_path: String,
    pub tender_id: String,
    pub user_id: String,
    #[serde(default)]
    pub options: ProcessingOptions,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessingResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ProcessingJob {
    pub fn new(
        file_path: impl Into<String>,
        tender_id: impl Into<String>,
        user_id: impl Into<String>,
        options: ProcessingOptions,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_path: file_path.into(),
            tender_id: tender_id.into(),
            user_id: user_id.into(),
            options,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Move to `Processing` and record the start time. No-op once the job
    /// has left the queued state.
    pub fn mark_processing(&mut self) {
        if self.status == JobStatus::Queued {
            self.status = JobStatus::Processing;
            self.started_at = Some(Utc::now());
        }
    }

    /// Attach the result and move to `Completed`. `completed_at` is set
    /// exactly once and never overwritten.
    pub fn mark_completed(&mut self, result: ProcessingResult) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.error = None;
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    /// Move to `Failed` with a human-readable error. Any partially computed
    /// result is discarded; failed jobs never carry one.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        if self.status == JobStatus::Completed {
            return;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.result = None;
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }
}

/// Final output of a successful pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub extracted_text: String,
    pub page_count: usize,
    pub file_size: u64,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub risk_analysis: RiskAnalysis,
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub quality_metrics: QualityMetrics,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Entity categories matched by the fixed pattern set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityKind {
    Cnpj,
    Cpf,
    Email,
    Phone,
    Currency,
    Date,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub value: String,
    pub confidence: f64,
    /// Byte offsets into the final extracted text.
    pub start_pos: usize,
    pub end_pos: usize,
    /// 1-based page the match falls on; 1 when page attribution is
    /// unavailable (OCR output has no page boundaries).
    pub page: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub overall_risk: RiskLevel,
    /// Always clamped to [0, 1].
    pub risk_score: f64,
    #[serde(default)]
    pub identified_risks: Vec<IdentifiedRisk>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifiedRisk {
    pub category: String,
    pub description: String,
    pub severity: String,
    pub impact: String,
    pub confidence: f64,
    pub location: String,
}

/// Heuristic 0-1 scores estimating extracted-text usefulness.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub text_quality: f64,
    pub ocr_confidence: f64,
    pub document_clarity: f64,
    pub completeness: f64,
    pub readability: f64,
}

/// Snapshot of worker pool activity, exposed to the API layer's stats
/// endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_workers: usize,
    pub active_jobs: usize,
    pub queued_jobs: usize,
    pub processed_jobs: u64,
    pub failed_jobs: u64,
    pub average_processing_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_processed: Option<DateTime<Utc>>,
}
