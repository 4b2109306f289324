use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::{
    error::{DbError, DbResult},
    JobStore,
};
use crate::models::ProcessingJob;

pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub async fn connect(url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn upsert_job(&self, job: &ProcessingJob) -> DbResult<()> {
        let result_json = job
            .result
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(DbError::Json)?;

        sqlx::query(
            r#"
            INSERT INTO processing_jobs (id, tender_id, user_id, status, result, created_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                result = EXCLUDED.result,
                completed_at = EXCLUDED.completed_at
            "#,
        )
        .bind(job.id)
        .bind(&job.tender_id)
        .bind(&job.user_id)
        .bind(job.status.as_str())
        .bind(result_json)
        .bind(job.created_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
