use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Status of a match analysis job.
///
/// The only legal transitions are `pending -> processing`,
/// `processing -> completed` and `processing -> failed`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

/// Structured result recovered from the model.
///
/// All four fields are required when deserializing; the lists may be empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub match_score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub suggestions: Vec<String>,
}

impl AnalysisResult {
    /// Clamp the score into `[0, 100]`.
    pub fn clamped(mut self) -> Self {
        self.match_score = self.match_score.clamp(0.0, 100.0);
        self
    }
}

/// Terminal outcome of processing one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(AnalysisResult),
    Failed(String),
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed(_) => JobStatus::Completed,
            JobOutcome::Failed(_) => JobStatus::Failed,
        }
    }

    /// Drop NUL characters, which PostgreSQL rejects in TEXT and JSONB.
    pub fn without_nul(self) -> Self {
        match self {
            JobOutcome::Completed(mut result) => {
                for list in [
                    &mut result.matched_skills,
                    &mut result.missing_skills,
                    &mut result.suggestions,
                ] {
                    list.iter_mut().for_each(strip_nul);
                }
                JobOutcome::Completed(result)
            }
            JobOutcome::Failed(mut message) => {
                strip_nul(&mut message);
                JobOutcome::Failed(message)
            }
        }
    }
}

pub fn strip_nul(text: &mut String) {
    if text.contains('\0') {
        text.retain(|c| c != '\0');
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid job transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// A persisted match analysis job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisJob {
    pub id: Uuid,
    pub owner_id: String,
    pub resume_text: String,
    pub job_description: String,
    pub status: JobStatus,
    /// Present only when `status` is `completed`.
    pub result: Option<AnalysisResult>,
    /// Present only when `status` is `failed`.
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Inputs for a job that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewAnalysisJob {
    pub id: Uuid,
    pub owner_id: String,
    pub resume_text: String,
    pub job_description: String,
}

impl NewAnalysisJob {
    pub fn new(
        owner_id: impl Into<String>,
        resume_text: impl Into<String>,
        job_description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            resume_text: resume_text.into(),
            job_description: job_description.into(),
        }
    }

    pub fn into_pending(self, created_at: DateTime<Utc>) -> AnalysisJob {
        AnalysisJob {
            id: self.id,
            owner_id: self.owner_id,
            resume_text: self.resume_text,
            job_description: self.job_description,
            status: JobStatus::Pending,
            result: None,
            error_message: None,
            created_at,
            completed_at: None,
        }
    }
}

impl AnalysisJob {
    pub fn begin_processing(&mut self) -> Result<(), InvalidTransition> {
        self.transition(JobStatus::Processing)
    }

    /// Record a terminal outcome and stamp the completion time.
    pub fn finish(
        &mut self,
        outcome: &JobOutcome,
        at: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.transition(outcome.status())?;
        match outcome {
            JobOutcome::Completed(result) => {
                self.result = Some(result.clone());
                self.error_message = None;
            }
            JobOutcome::Failed(message) => {
                self.result = None;
                self.error_message = Some(message.clone());
            }
        }
        self.completed_at = Some(at);
        Ok(())
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
