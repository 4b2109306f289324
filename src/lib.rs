//! Asynchronous ingestion pipeline for procurement documents.
//!
//! Uploaded documents are queued on a bounded [`WorkerPool`], processed by
//! the [`DocumentProcessor`] (text extraction, OCR fallback, heuristic
//! quality/risk/relevance scoring), persisted to a TTL cache and a durable
//! store, and finally announced to the downstream analysis engine.
//!
//! The API layer submitting jobs and polling status lives in a separate
//! service; this crate exposes `submit`, `stats`, and `health_check` on the
//! pool as its integration surface.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod db;
pub mod events;
pub mod extraction;
pub mod models;
pub mod pool;
pub mod processor;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use pool::{PoolError, WorkerPool};
pub use processor::{DocumentProcessor, ProcessError, ProcessingLimits};
