use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{JobStore, StorageError};
use crate::models::job::{AnalysisJob, JobOutcome, JobStatus, NewAnalysisJob};

#[derive(Default)]
struct Entry {
    job: Option<AnalysisJob>,
    history: Vec<JobStatus>,
}

/// Process-local job store. Also records every status a job has held.
#[derive(Default)]
pub struct MemoryJobStore {
    entries: RwLock<HashMap<Uuid, Entry>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses the job has held, oldest first. Survives deletion.
    pub async fn status_history(&self, id: Uuid) -> Vec<JobStatus> {
        self.entries
            .read()
            .await
            .get(&id)
            .map(|e| e.history.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, job: NewAnalysisJob) -> Result<AnalysisJob, StorageError> {
        let job = job.into_pending(Utc::now());
        self.entries.write().await.insert(
            job.id,
            Entry {
                job: Some(job.clone()),
                history: vec![job.status],
            },
        );
        Ok(job)
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<AnalysisJob>, StorageError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&id)
            .and_then(|e| e.job.clone()))
    }

    async fn get_job_for_owner(
        &self,
        id: Uuid,
        owner_id: &str,
    ) -> Result<Option<AnalysisJob>, StorageError> {
        Ok(self.get_job(id).await?.filter(|j| j.owner_id == owner_id))
    }

    async fn list_jobs_for_owner(
        &self,
        owner_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AnalysisJob>, StorageError> {
        let entries = self.entries.read().await;
        let mut jobs: Vec<AnalysisJob> = entries
            .values()
            .filter_map(|e| e.job.as_ref())
            .filter(|j| j.owner_id == owner_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(jobs
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn mark_processing(&self, id: Uuid) -> Result<bool, StorageError> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(&id) else {
            return Ok(false);
        };
        let Some(job) = entry.job.as_mut() else {
            return Ok(false);
        };
        if job.begin_processing().is_err() {
            return Ok(false);
        }
        entry.history.push(job.status);
        Ok(true)
    }

    async fn finish_job(&self, id: Uuid, outcome: &JobOutcome) -> Result<bool, StorageError> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(&id) else {
            return Ok(false);
        };
        let Some(job) = entry.job.as_mut() else {
            return Ok(false);
        };
        if job.finish(outcome, Utc::now()).is_err() {
            return Ok(false);
        }
        entry.history.push(job.status);
        Ok(true)
    }

    async fn delete_job_for_owner(&self, id: Uuid, owner_id: &str) -> Result<bool, StorageError> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&id) {
            Some(entry) if entry.job.as_ref().is_some_and(|j| j.owner_id == owner_id) => {
                entry.job = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
