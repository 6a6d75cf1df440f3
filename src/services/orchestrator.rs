use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::{JobStore, StorageError};
use crate::models::job::{AnalysisJob, JobOutcome, NewAnalysisJob};
use crate::services::inference::InferenceClient;
use crate::services::prompt;

pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on jobs running inference at the same time.
    pub max_concurrent_jobs: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
        }
    }
}

/// Drives analysis jobs from `pending` to a terminal state.
#[derive(Clone)]
pub struct JobOrchestrator {
    store: Arc<dyn JobStore>,
    inference: Arc<InferenceClient>,
    permits: Arc<Semaphore>,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        inference: InferenceClient,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            inference: Arc::new(inference),
            permits: Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1))),
        }
    }

    /// Persist a new `pending` job. No model call happens here.
    pub async fn create(
        &self,
        owner_id: &str,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AnalysisJob, StorageError> {
        let job = self
            .store
            .create_job(NewAnalysisJob::new(owner_id, resume_text, job_description))
            .await?;

        metrics::counter!("analysis_jobs_total").increment(1);
        tracing::info!(job_id = %job.id, owner_id = %job.owner_id, "Analysis job created");
        Ok(job)
    }

    /// Run `process` in the background once a worker permit is free.
    pub fn submit(&self, job_id: Uuid) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            let _permit = match orchestrator.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!(job_id = %job_id, "Worker pool closed, job left pending");
                    return;
                }
            };
            orchestrator.process(job_id).await;
        })
    }

    /// Advance one job through the state machine.
    ///
    /// Never fails outward: every error ends up in the job record or the log.
    pub async fn process(&self, job_id: Uuid) {
        let job = match self.store.get_job(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::error!(job_id = %job_id, "Analysis job not found");
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to load analysis job");
                return;
            }
        };

        match self.store.mark_processing(job_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    job_id = %job_id,
                    status = %job.status,
                    "Job is not pending, skipping"
                );
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark job processing");
                return;
            }
        }

        tracing::info!(job_id = %job_id, "Processing analysis job");
        let start = Instant::now();
        let outcome = self.run_inference(&job).await;
        metrics::histogram!("analysis_processing_seconds").record(start.elapsed().as_secs_f64());

        self.record_outcome(job_id, outcome).await;
    }

    async fn run_inference(&self, job: &AnalysisJob) -> JobOutcome {
        let prompt = prompt::compile(&job.resume_text, &job.job_description);
        let inference = self.inference.clone();

        // A separate task so a panicking backend surfaces as a JoinError.
        let handle = tokio::spawn(async move { inference.infer(&prompt).await });

        match handle.await {
            Ok(Ok(result)) => JobOutcome::Completed(result),
            Ok(Err(e)) => JobOutcome::Failed(e.to_string()),
            Err(e) => JobOutcome::Failed(format!("Analysis task aborted: {e}")),
        }
    }

    async fn record_outcome(&self, job_id: Uuid, outcome: JobOutcome) {
        let outcome = outcome.without_nul();
        let error = match self.store.finish_job(job_id, &outcome).await {
            Ok(recorded) => return log_outcome(job_id, &outcome, recorded),
            Err(e) => e,
        };

        tracing::error!(
            job_id = %job_id,
            status = %outcome.status(),
            error = %error,
            "Failed to record job outcome"
        );

        // A result that cannot be stored still has to leave `processing`.
        if let JobOutcome::Completed(_) = outcome {
            let fallback =
                JobOutcome::Failed(format!("Failed to store analysis result: {error}")).without_nul();
            match self.store.finish_job(job_id, &fallback).await {
                Ok(recorded) => log_outcome(job_id, &fallback, recorded),
                Err(e) => {
                    tracing::error!(
                        job_id = %job_id,
                        error = %e,
                        "Failed to record storage failure, job left processing"
                    );
                }
            }
        }
    }
}

fn log_outcome(job_id: Uuid, outcome: &JobOutcome, recorded: bool) {
    if !recorded {
        tracing::warn!(
            job_id = %job_id,
            status = %outcome.status(),
            "Job left processing before its outcome was recorded"
        );
        return;
    }

    match outcome {
        JobOutcome::Completed(result) => {
            metrics::counter!("analysis_jobs_completed").increment(1);
            tracing::info!(
                job_id = %job_id,
                match_score = result.match_score,
                matched = result.matched_skills.len(),
                missing = result.missing_skills.len(),
                "Analysis job completed"
            );
        }
        JobOutcome::Failed(message) => {
            metrics::counter!("analysis_jobs_failed").increment(1);
            tracing::error!(job_id = %job_id, error = %message, "Analysis job failed");
        }
    }
}
