//! Fire-and-forget trigger for the downstream analysis engine.
//!
//! Delivery is best-effort, at-most-once: the processor spawns the call
//! without awaiting it, and delivery failures are swallowed by design.
//! Redelivery, if needed, is the downstream service's concern.

use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait AnalysisTrigger: Send + Sync {
    /// Notify the analysis engine that a job's extracted text is ready.
    /// Must never fail loudly; implementations log and swallow errors.
    async fn job_ready(&self, job_id: Uuid);
}

/// HTTP trigger posting `{"job_id": ...}` to the analysis service.
pub struct HttpAnalysisTrigger {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalysisTrigger {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AnalysisTrigger for HttpAnalysisTrigger {
    async fn job_ready(&self, job_id: Uuid) {
        let payload = serde_json::json!({ "job_id": job_id });
        match self.client.post(&self.endpoint).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::debug!(
                    %job_id,
                    status = %response.status(),
                    "analysis trigger rejected"
                );
            }
            Ok(_) => {
                tracing::debug!(%job_id, "analysis triggered");
            }
            Err(e) => {
                tracing::debug!(%job_id, error = %e, "analysis trigger failed");
            }
        }
    }
}

/// No-op trigger used when no analysis endpoint is configured.
pub struct NoopTrigger;

#[async_trait]
impl AnalysisTrigger for NoopTrigger {
    async fn job_ready(&self, job_id: Uuid) {
        tracing::debug!(%job_id, "analysis trigger disabled, dropping event");
    }
}
