use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::models::job::{AnalysisJob, JobOutcome, NewAnalysisJob};

pub mod memory;
pub mod queries;

pub use memory::MemoryJobStore;
pub use queries::PgJobStore;

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// Persistence for analysis jobs.
///
/// Each mutation is committed on its own so readers observe every
/// intermediate state. The conditional updates return `false` when the job
/// is missing or not in the expected source state.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: NewAnalysisJob) -> Result<AnalysisJob, StorageError>;

    async fn get_job(&self, id: Uuid) -> Result<Option<AnalysisJob>, StorageError>;

    async fn get_job_for_owner(
        &self,
        id: Uuid,
        owner_id: &str,
    ) -> Result<Option<AnalysisJob>, StorageError>;

    /// Newest first.
    async fn list_jobs_for_owner(
        &self,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AnalysisJob>, StorageError>;

    /// `pending -> processing`.
    async fn mark_processing(&self, id: Uuid) -> Result<bool, StorageError>;

    /// `processing -> completed | failed`, stamping `completed_at`.
    async fn finish_job(&self, id: Uuid, outcome: &JobOutcome) -> Result<bool, StorageError>;

    async fn delete_job_for_owner(&self, id: Uuid, owner_id: &str) -> Result<bool, StorageError>;

    async fn ping(&self) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt job record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}
