use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Body of an Ollama `/api/generate` request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// Advisory only; models do not always honor it.
    pub format: String,
    pub stream: bool,
    pub options: SamplingOptions,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// A text generator that turns a prompt into raw, untrusted text.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, BackendError>;
}

/// Client for a local Ollama server.
pub struct OllamaBackend {
    http: Client,
    base_url: String,
}

impl OllamaBackend {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let http = Client::builder().build().map_err(BackendError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, BackendError> {
        let response = self
            .http
            .post(self.generate_url())
            .json(request)
            .send()
            .await
            .map_err(BackendError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let envelope: GenerateResponse = response.json().await.map_err(BackendError::Http)?;
        tracing::debug!(
            model = %request.model,
            response_chars = envelope.response.len(),
            "Model backend responded"
        );
        Ok(envelope.response)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP request to model backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("model backend did not answer within {0:?}")]
    Timeout(Duration),
}

impl BackendError {
    /// A 4xx that signals a malformed request rather than a transient fault.
    pub fn is_client_error(&self) -> bool {
        match self {
            BackendError::Status { status, .. } => {
                status.is_client_error()
                    && *status != StatusCode::REQUEST_TIMEOUT
                    && *status != StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
