use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::models::job::AnalysisResult;
use crate::services::extract::{self, ExtractJsonError};
use crate::services::ollama::{BackendError, GenerateRequest, ModelBackend, SamplingOptions};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(180);

/// Which failed attempts are worth another try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Retry every failure class.
    #[default]
    All,
    /// Give up immediately on a backend 4xx that is not 408 or 429.
    SkipClientErrors,
}

impl RetryPolicy {
    fn should_retry(self, error: &AttemptError) -> bool {
        match (self, error) {
            (RetryPolicy::All, _) => true,
            (RetryPolicy::SkipClientErrors, AttemptError::Backend(e)) => !e.is_client_error(),
            (RetryPolicy::SkipClientErrors, _) => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    /// Multiplied by the attempt number between attempts. Zero disables the pause.
    pub retry_backoff: Duration,
    pub retry_policy: RetryPolicy,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model: "mistral".to_string(),
            temperature: 0.3,
            max_output_tokens: 2048,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: Duration::ZERO,
            retry_policy: RetryPolicy::All,
        }
    }
}

/// Sends prompts to the model backend and recovers an [`AnalysisResult`]
/// from whatever text comes back, retrying within a fixed attempt budget.
pub struct InferenceClient {
    backend: Arc<dyn ModelBackend>,
    config: InferenceConfig,
}

impl InferenceClient {
    pub fn new(backend: Arc<dyn ModelBackend>, config: InferenceConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn request_for(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            format: "json".to_string(),
            stream: false,
            options: SamplingOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_output_tokens,
            },
        }
    }

    pub async fn infer(&self, prompt: &str) -> Result<AnalysisResult, InferenceError> {
        let request = self.request_for(prompt);
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let start = Instant::now();
            let outcome = self.attempt(&request).await;
            metrics::histogram!("inference_duration_seconds").record(start.elapsed().as_secs_f64());

            match outcome {
                Ok(result) => {
                    metrics::counter!("inference_attempts_total", "outcome" => "success")
                        .increment(1);
                    tracing::info!(
                        attempt,
                        match_score = result.match_score,
                        "Model analysis accepted"
                    );
                    return Ok(result);
                }
                Err(error) => {
                    metrics::counter!("inference_attempts_total", "outcome" => error.kind())
                        .increment(1);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        kind = error.kind(),
                        error = %error,
                        "Model attempt failed"
                    );

                    if attempt >= max_attempts || !self.config.retry_policy.should_retry(&error) {
                        return Err(InferenceError::Exhausted {
                            attempts: attempt,
                            last: error,
                        });
                    }
                }
            }

            if !self.config.retry_backoff.is_zero() {
                tokio::time::sleep(self.config.retry_backoff * attempt).await;
            }
            attempt += 1;
        }
    }

    async fn attempt(&self, request: &GenerateRequest) -> Result<AnalysisResult, AttemptError> {
        let timeout = self.config.attempt_timeout;
        let raw = tokio::time::timeout(timeout, self.backend.generate(request))
            .await
            .map_err(|_| BackendError::Timeout(timeout))??;

        tracing::debug!(response_chars = raw.len(), "Parsing model output");
        let value = extract::extract_json(&raw)?;
        Ok(validate(value)?.clamped())
    }
}

/// Check a recovered JSON value against the result shape.
pub fn validate(value: Value) -> Result<AnalysisResult, SchemaError> {
    if !value.is_object() {
        return Err(SchemaError::NotAnObject(json_kind(&value)));
    }
    serde_json::from_value(value).map_err(SchemaError::Fields)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("model returned a JSON {0}, expected an object")]
    NotAnObject(&'static str),

    #[error("model JSON does not match the result shape: {0}")]
    Fields(#[source] serde_json::Error),
}

/// Why a single attempt was rejected.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Parse(#[from] ExtractJsonError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl AttemptError {
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Backend(BackendError::Timeout(_)) => "timeout",
            AttemptError::Backend(_) => "transport",
            AttemptError::Parse(_) => "parse",
            AttemptError::Schema(_) => "schema",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error(
        "Failed to get valid analysis from model after {attempts} {}: {last}",
        attempt_noun(.attempts)
    )]
    Exhausted {
        attempts: u32,
        #[source]
        last: AttemptError,
    },
}

fn attempt_noun(attempts: &u32) -> &'static str {
    if *attempts == 1 {
        "attempt"
    } else {
        "attempts"
    }
}

impl InferenceError {
    pub fn last_cause(&self) -> &AttemptError {
        match self {
            InferenceError::Exhausted { last, .. } => last,
        }
    }
}
