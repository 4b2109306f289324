use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{error::DbResult, JobStore};
use crate::models::{JobStatus, ProcessingJob};

/// A stored job row, mirroring the columns of the `processing_jobs` table.
#[derive(Debug, Clone)]
pub struct StoredJob {
    pub tender_id: String,
    pub user_id: String,
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// In-memory job store for single-node development and tests.
///
/// Upsert semantics match the Postgres implementation: last write for a
/// given job id wins.
#[derive(Default)]
pub struct MemoryJobStore {
    rows: DashMap<Uuid, StoredJob>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<StoredJob> {
        self.rows.get(&id).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn upsert_job(&self, job: &ProcessingJob) -> DbResult<()> {
        let result = job.result.as_ref().map(serde_json::to_value).transpose()?;
        self.rows.insert(
            job.id,
            StoredJob {
                tender_id: job.tender_id.clone(),
                user_id: job.user_id.clone(),
                status: job.status,
                result,
                created_at: job.created_at,
                completed_at: job.completed_at,
            },
        );
        Ok(())
    }
}
