//! Bounded worker pool dispatching jobs to the document processor.
//!
//! A fixed set of long-lived worker tasks consumes one shared bounded queue
//! (capacity `2 * workers`). True concurrency is additionally bounded by a
//! semaphore sized independently of the worker count, so it can be tuned
//! without resizing the task set. Submission never blocks: a saturated
//! queue is reported to the caller as backpressure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::{mpsc, mpsc::error::TrySendError, Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::{
    models::{PoolStats, ProcessingJob},
    processor::DocumentProcessor,
};

/// Whole-job bound, shared between waiting for a concurrency slot and
/// executing the pipeline.
pub const JOB_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Bound on the health probe's permit acquisition.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Permanent rejection: the pool was never started or has been stopped.
    #[error("worker pool is closed")]
    Closed,

    /// Transient backpressure: the queue is saturated. Callers should retry
    /// with backoff.
    #[error("job queue is full")]
    QueueFull,

    /// Liveness signal from the health check: no concurrency slot freed up
    /// within the probe timeout.
    #[error("worker pool is overloaded")]
    Overloaded,
}

/// Activity flag and counters, guarded by a single reader/writer lock.
/// Stats and health reads take the read lock; start/stop take the write
/// lock.
#[derive(Default)]
struct PoolState {
    active: bool,
    stopped: bool,
    processed_jobs: u64,
    failed_jobs: u64,
    total_processing_ms: u64,
    last_processed: Option<DateTime<Utc>>,
}

struct PoolShared {
    processor: Arc<DocumentProcessor>,
    receiver: Mutex<mpsc::Receiver<ProcessingJob>>,
    semaphore: Semaphore,
    state: RwLock<PoolState>,
}

impl PoolShared {
    fn record_success(&self, elapsed: Duration) {
        let mut state = self.state.write();
        state.processed_jobs += 1;
        state.total_processing_ms += elapsed.as_millis() as u64;
        state.last_processed = Some(Utc::now());
    }

    fn record_failure(&self) {
        let mut state = self.state.write();
        state.failed_jobs += 1;
        state.last_processed = Some(Utc::now());
    }
}

pub struct WorkerPool {
    workers: usize,
    sender: mpsc::Sender<ProcessingJob>,
    shared: Arc<PoolShared>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(workers: usize, processor: Arc<DocumentProcessor>) -> Self {
        assert!(workers > 0, "worker pool needs at least one worker");
        let (sender, receiver) = mpsc::channel(workers * 2);
        Self {
            workers,
            sender,
            shared: Arc::new(PoolShared {
                processor,
                receiver: Mutex::new(receiver),
                semaphore: Semaphore::new(workers),
                state: RwLock::new(PoolState::default()),
            }),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Launch the worker tasks. Idempotent while the pool is active; a
    /// stopped pool stays stopped.
    pub fn start(&self) {
        {
            let mut state = self.shared.state.write();
            if state.active || state.stopped {
                return;
            }
            state.active = true;
        }

        for worker_id in 0..self.workers {
            let shared = Arc::clone(&self.shared);
            let cancel = self.cancel.clone();
            self.tracker.spawn(Self::worker(worker_id, shared, cancel));
        }

        tracing::info!(workers = self.workers, "worker pool started");
    }

    /// Signal workers to exit and wait for in-flight jobs to finish.
    /// Idempotent. Jobs still sitting in the queue are dropped; redelivery
    /// is the submitter's responsibility.
    pub async fn stop(&self) {
        {
            let mut state = self.shared.state.write();
            if !state.active {
                return;
            }
            state.active = false;
            state.stopped = true;
        }

        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        tracing::info!("worker pool stopped");
    }

    /// Enqueue a job without blocking. Fails fast with [`PoolError::Closed`]
    /// when inactive and [`PoolError::QueueFull`] on a saturated queue.
    pub fn submit(&self, job: ProcessingJob) -> Result<(), PoolError> {
        {
            let state = self.shared.state.read();
            if !state.active {
                return Err(PoolError::Closed);
            }
        }

        let job_id = job.id;
        match self.sender.try_send(job) {
            Ok(()) => {
                tracing::info!(%job_id, "job queued for processing");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(PoolError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(PoolError::Closed),
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.state.read().active
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.read();
        let average_processing_ms = if state.processed_jobs > 0 {
            state.total_processing_ms as f64 / state.processed_jobs as f64
        } else {
            0.0
        };
        PoolStats {
            total_workers: self.workers,
            active_jobs: self.workers - self.shared.semaphore.available_permits(),
            queued_jobs: self.sender.max_capacity() - self.sender.capacity(),
            processed_jobs: state.processed_jobs,
            failed_jobs: state.failed_jobs,
            average_processing_ms,
            last_processed: state.last_processed,
        }
    }

    /// Probe pool liveness by acquiring and releasing one concurrency slot.
    pub async fn health_check(&self) -> Result<(), PoolError> {
        {
            let state = self.shared.state.read();
            if !state.active {
                return Err(PoolError::Closed);
            }
        }

        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, self.shared.semaphore.acquire()).await {
            Ok(Ok(_permit)) => Ok(()),
            Ok(Err(_)) => Err(PoolError::Closed),
            Err(_) => Err(PoolError::Overloaded),
        }
    }

    async fn worker(worker_id: usize, shared: Arc<PoolShared>, cancel: CancellationToken) {
        tracing::debug!(worker_id, "worker started");

        loop {
            let job = {
                let mut receiver = shared.receiver.lock().await;
                tokio::select! {
                    _ = cancel.cancelled() => None,
                    job = receiver.recv() => job,
                }
            };

            let Some(job) = job else {
                tracing::debug!(worker_id, "worker stopping");
                return;
            };

            Self::process_job(worker_id, &shared, job).await;
        }
    }

    /// Run one job under the shared 30-minute deadline. Errors mark the job
    /// failed and are persisted; they never terminate the worker loop.
    async fn process_job(worker_id: usize, shared: &PoolShared, mut job: ProcessingJob) {
        let started = Instant::now();
        let job_id = job.id;

        let permit = match tokio::time::timeout(JOB_TIMEOUT, shared.semaphore.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) | Err(_) => {
                tracing::error!(worker_id, %job_id, "timed out waiting for a processing slot");
                Self::fail_job(shared, &mut job, "timed out waiting for a processing slot").await;
                shared.record_failure();
                return;
            }
        };

        tracing::info!(worker_id, %job_id, "processing job");

        let remaining = JOB_TIMEOUT.saturating_sub(started.elapsed());
        let outcome =
            tokio::time::timeout(remaining, shared.processor.process_document(&mut job)).await;
        drop(permit);

        match outcome {
            Ok(Ok(())) => {
                let elapsed = started.elapsed();
                shared.record_success(elapsed);
                tracing::info!(
                    worker_id,
                    %job_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "job finished"
                );
            }
            Ok(Err(e)) => {
                // The processor already marked and persisted the failure.
                tracing::warn!(worker_id, %job_id, error = %e, "job failed");
                if !job.status.is_terminal() {
                    Self::fail_job(shared, &mut job, e.to_string()).await;
                }
                shared.record_failure();
            }
            Err(_) => {
                tracing::error!(worker_id, %job_id, timeout_secs = JOB_TIMEOUT.as_secs(), "job timed out");
                Self::fail_job(shared, &mut job, "processing timed out").await;
                shared.record_failure();
            }
        }
    }

    async fn fail_job(shared: &PoolShared, job: &mut ProcessingJob, error: impl Into<String>) {
        job.mark_failed(error);
        shared.processor.persist_status(job).await;
    }
}
