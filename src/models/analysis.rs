use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{strip_nul, AnalysisJob, JobStatus};

const PREVIEW_CHARS: usize = 120;
const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Text inputs of a submission, checked before any job is created.
#[derive(Debug, Validate)]
pub struct AnalysisRequest {
    #[garde(length(chars, min = 1, max = 100_000))]
    pub resume_text: String,

    #[garde(length(chars, min = 1, max = 20_000))]
    pub job_description: String,
}

impl AnalysisRequest {
    pub fn new(resume_text: impl Into<String>, job_description: &str) -> Self {
        let mut resume_text = resume_text.into();
        strip_nul(&mut resume_text);
        let mut job_description = job_description.to_string();
        strip_nul(&mut job_description);

        Self {
            resume_text,
            job_description: job_description.trim().to_string(),
        }
    }
}

/// Response after submitting a resume for analysis.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisCreatedResponse {
    pub id: Uuid,
    pub status: JobStatus,
}

/// Full view of one analysis job.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisView {
    pub id: Uuid,
    pub status: JobStatus,
    pub job_description: String,
    pub match_score: Option<f64>,
    pub matched_skills: Option<Vec<String>>,
    pub missing_skills: Option<Vec<String>>,
    pub suggestions: Option<Vec<String>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<AnalysisJob> for AnalysisView {
    fn from(job: AnalysisJob) -> Self {
        let (match_score, matched_skills, missing_skills, suggestions) = match job.result {
            Some(r) => (
                Some(r.match_score),
                Some(r.matched_skills),
                Some(r.missing_skills),
                Some(r.suggestions),
            ),
            None => (None, None, None, None),
        };

        Self {
            id: job.id,
            status: job.status,
            job_description: job.job_description,
            match_score,
            matched_skills,
            missing_skills,
            suggestions,
            error_message: job.error_message,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

/// One row of the history listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisListItem {
    pub id: Uuid,
    pub status: JobStatus,
    pub match_score: Option<f64>,
    pub job_description_preview: String,
    pub created_at: DateTime<Utc>,
}

impl From<AnalysisJob> for AnalysisListItem {
    fn from(job: AnalysisJob) -> Self {
        Self {
            id: job.id,
            status: job.status,
            match_score: job.result.map(|r| r.match_score),
            job_description_preview: preview(&job.job_description),
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListQuery {
    pub fn limit(&self) -> i64 {
        i64::from(self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE))
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.offset.unwrap_or(0))
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
