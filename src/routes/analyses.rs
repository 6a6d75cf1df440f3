use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::auth::Owner;
use crate::models::analysis::{
    AnalysisCreatedResponse, AnalysisListItem, AnalysisRequest, AnalysisView,
};
use crate::routes::error::ApiError;
use crate::routes::params::{JobId, Page};

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// POST /api/v1/analyses — Upload a resume PDF and job description.
///
/// Responds `202` with the pending job; the model runs in the background.
pub async fn submit_analysis(
    State(state): State<AppState>,
    Owner(owner): Owner,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AnalysisCreatedResponse>), ApiError> {
    let mut resume: Option<Upload> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("resume") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                resume = Some(Upload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            Some("job_description") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                job_description = Some(text);
            }
            _ => {}
        }
    }

    let resume = resume.ok_or_else(|| ApiError::BadRequest("Missing resume file".to_string()))?;
    if !resume.filename.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::BadRequest("Only PDF files are accepted".to_string()));
    }
    if resume.bytes.len() > state.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge {
            limit_mb: state.max_upload_bytes / (1024 * 1024),
        });
    }

    let extractor = state.extractor.clone();
    let resume_text = tokio::task::spawn_blocking(move || extractor.extract(&resume.bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Text extraction task failed: {e}")))??;

    let request = AnalysisRequest::new(resume_text, job_description.as_deref().unwrap_or_default());
    request.validate()?;

    let job = state
        .orchestrator
        .create(&owner, &request.resume_text, &request.job_description)
        .await?;
    state.orchestrator.submit(job.id);

    Ok((
        StatusCode::ACCEPTED,
        Json(AnalysisCreatedResponse {
            id: job.id,
            status: job.status,
        }),
    ))
}

/// GET /api/v1/analyses/{id} — Current status and, once terminal, the outcome.
pub async fn get_analysis(
    State(state): State<AppState>,
    Owner(owner): Owner,
    JobId(id): JobId,
) -> Result<Json<AnalysisView>, ApiError> {
    let job = state
        .store
        .get_job_for_owner(id, &owner)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(job.into()))
}

/// GET /api/v1/analyses — The caller's analyses, newest first.
pub async fn list_analyses(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Page(query): Page,
) -> Result<Json<Vec<AnalysisListItem>>, ApiError> {
    let jobs = state
        .store
        .list_jobs_for_owner(&owner, query.limit(), query.offset())
        .await?;
    Ok(Json(jobs.into_iter().map(AnalysisListItem::from).collect()))
}

/// DELETE /api/v1/analyses/{id}
pub async fn delete_analysis(
    State(state): State<AppState>,
    Owner(owner): Owner,
    JobId(id): JobId,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_job_for_owner(id, &owner).await? {
        tracing::info!(job_id = %id, owner_id = %owner, "Analysis deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
