//! Test helper utilities for E2E testing

use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::multipart;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

use match_analyzer::auth::Claims;

/// Response from POST /api/v1/analyses
#[derive(Debug, Deserialize)]
pub struct CreatedResponse {
    pub id: Uuid,
    pub status: String,
}

/// Response from GET /api/v1/analyses/{id}
#[derive(Debug, Deserialize)]
pub struct AnalysisResponse {
    pub id: Uuid,
    pub status: String,
    pub match_score: Option<f64>,
    pub matched_skills: Option<Vec<String>>,
    pub missing_skills: Option<Vec<String>>,
    pub suggestions: Option<Vec<String>>,
    pub error_message: Option<String>,
}

/// Sign a short-lived token for `sub` with JWT_SECRET.
pub fn bearer_for(sub: &str) -> String {
    let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set for E2E tests");
    let claims = Claims {
        sub: sub.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign token");
    format!("Bearer {token}")
}

/// Upload a resume PDF with a job description
pub async fn submit_analysis(
    client: &reqwest::Client,
    base_url: &str,
    bearer: &str,
    filename: &str,
    pdf: Vec<u8>,
    job_description: &str,
) -> Result<CreatedResponse, Box<dyn std::error::Error>> {
    let form = multipart::Form::new()
        .part(
            "resume",
            multipart::Part::bytes(pdf)
                .file_name(filename.to_string())
                .mime_str("application/pdf")?,
        )
        .text("job_description", job_description.to_string());

    let response = client
        .post(format!("{base_url}/api/v1/analyses"))
        .header(reqwest::header::AUTHORIZATION, bearer)
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(format!("Upload failed with status {status}: {error_text}").into());
    }

    Ok(response.json::<CreatedResponse>().await?)
}

/// Poll the analysis until completed or failed (with timeout)
pub async fn poll_analysis(
    client: &reqwest::Client,
    base_url: &str,
    bearer: &str,
    id: Uuid,
    timeout_secs: u64,
) -> Result<AnalysisResponse, Box<dyn std::error::Error>> {
    let max_attempts = timeout_secs * 2; // Poll every 500ms

    for attempt in 0..max_attempts {
        let response = client
            .get(format!("{base_url}/api/v1/analyses/{id}"))
            .header(reqwest::header::AUTHORIZATION, bearer)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Status check failed: {error_text}").into());
        }

        let analysis = response.json::<AnalysisResponse>().await?;

        match analysis.status.as_str() {
            "completed" | "failed" => return Ok(analysis),
            "pending" | "processing" => {
                if attempt % 10 == 0 && attempt > 0 {
                    println!("  ... still waiting (attempt {attempt}/{max_attempts})");
                }
                sleep(Duration::from_millis(500)).await;
            }
            other => return Err(format!("Unknown job status: {other}").into()),
        }
    }

    Err(format!("Analysis did not finish within {timeout_secs} seconds").into())
}
