//! Durable job store.
//!
//! One idempotent upsert per job, keyed by job id. The store is the system
//! of record for finished jobs; writes are best-effort from the pipeline's
//! point of view and never block job completion.

mod error;
mod memory;
mod postgres;

pub use error::{DbError, DbResult};
pub use memory::MemoryJobStore;
pub use postgres::PostgresJobStore;

use async_trait::async_trait;

use crate::models::ProcessingJob;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or update the record for this job id. Last write wins;
    /// repeating the call with the same final values leaves one logical
    /// record.
    async fn upsert_job(&self, job: &ProcessingJob) -> DbResult<()>;
}
