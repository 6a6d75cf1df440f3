use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::db::{JobStore, StorageError};
use crate::models::job::{AnalysisJob, AnalysisResult, JobOutcome, JobStatus, NewAnalysisJob};

const JOB_COLUMNS: &str = "id, owner_id, resume_text, job_description, status, error_message, \
     match_score, matched_skills, missing_skills, suggestions, created_at, completed_at";

/// PostgreSQL-backed job store.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn job_from_row(row: &PgRow) -> Result<AnalysisJob, StorageError> {
    let id: Uuid = row.try_get("id")?;
    let status_str: String = row.try_get("status")?;
    let status = JobStatus::from_str(&status_str).map_err(|_| StorageError::Corrupt {
        id,
        reason: format!("unknown status `{status_str}`"),
    })?;

    let match_score: Option<f64> = row.try_get("match_score")?;
    let matched: Option<Json<Vec<String>>> = row.try_get("matched_skills")?;
    let missing: Option<Json<Vec<String>>> = row.try_get("missing_skills")?;
    let suggestions: Option<Json<Vec<String>>> = row.try_get("suggestions")?;

    let result = match (status, match_score, matched, missing, suggestions) {
        (JobStatus::Completed, Some(score), Some(matched), Some(missing), Some(suggestions)) => {
            Some(AnalysisResult {
                match_score: score,
                matched_skills: matched.0,
                missing_skills: missing.0,
                suggestions: suggestions.0,
            })
        }
        (JobStatus::Completed, ..) => {
            return Err(StorageError::Corrupt {
                id,
                reason: "completed job without result columns".to_string(),
            })
        }
        _ => None,
    };

    Ok(AnalysisJob {
        id,
        owner_id: row.try_get("owner_id")?,
        resume_text: row.try_get("resume_text")?,
        job_description: row.try_get("job_description")?,
        status,
        result,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(&self, job: NewAnalysisJob) -> Result<AnalysisJob, StorageError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO analysis_jobs (id, owner_id, resume_text, job_description, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job.id)
        .bind(&job.owner_id)
        .bind(&job.resume_text)
        .bind(&job.job_description)
        .fetch_one(&self.pool)
        .await?;

        job_from_row(&row)
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<AnalysisJob>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM analysis_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    async fn get_job_for_owner(
        &self,
        id: Uuid,
        owner_id: &str,
    ) -> Result<Option<AnalysisJob>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM analysis_jobs WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    async fn list_jobs_for_owner(
        &self,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AnalysisJob>, StorageError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM analysis_jobs
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    async fn mark_processing(&self, id: Uuid) -> Result<bool, StorageError> {
        let updated = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET status = 'processing'
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() == 1)
    }

    async fn finish_job(&self, id: Uuid, outcome: &JobOutcome) -> Result<bool, StorageError> {
        let updated = match outcome {
            JobOutcome::Completed(result) => {
                sqlx::query(
                    r#"
                    UPDATE analysis_jobs
                    SET status = 'completed',
                        match_score = $2,
                        matched_skills = $3,
                        missing_skills = $4,
                        suggestions = $5,
                        error_message = NULL,
                        completed_at = NOW()
                    WHERE id = $1 AND status = 'processing'
                    "#,
                )
                .bind(id)
                .bind(result.match_score)
                .bind(Json(&result.matched_skills))
                .bind(Json(&result.missing_skills))
                .bind(Json(&result.suggestions))
                .execute(&self.pool)
                .await?
            }
            JobOutcome::Failed(message) => {
                sqlx::query(
                    r#"
                    UPDATE analysis_jobs
                    SET status = 'failed',
                        error_message = $2,
                        completed_at = NOW()
                    WHERE id = $1 AND status = 'processing'
                    "#,
                )
                .bind(id)
                .bind(message)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(updated.rows_affected() == 1)
    }

    async fn delete_job_for_owner(&self, id: Uuid, owner_id: &str) -> Result<bool, StorageError> {
        let deleted = sqlx::query("DELETE FROM analysis_jobs WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() == 1)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
