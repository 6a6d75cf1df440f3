use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::inference::{InferenceConfig, RetryPolicy};
use crate::services::orchestrator::OrchestratorConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Base URL of the Ollama server
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    /// Model name passed to Ollama
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,

    /// HS256 secret used to verify bearer tokens
    pub jwt_secret: String,

    #[serde(default = "default_inference_timeout_secs")]
    pub inference_timeout_secs: u64,

    #[serde(default = "default_inference_max_attempts")]
    pub inference_max_attempts: u32,

    #[serde(default)]
    pub inference_retry_backoff_ms: u64,

    /// When false, a backend 4xx (other than 408/429) ends the attempt loop
    #[serde(default = "default_true")]
    pub retry_client_errors: bool,

    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Directory containing the Pdfium shared library
    #[serde(default)]
    pub pdfium_lib_path: Option<PathBuf>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "mistral".to_string()
}

fn default_inference_timeout_secs() -> u64 {
    180
}

fn default_inference_max_attempts() -> u32 {
    crate::services::inference::DEFAULT_MAX_ATTEMPTS
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_jobs() -> usize {
    crate::services::orchestrator::DEFAULT_MAX_CONCURRENT_JOBS
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            model: self.ollama_model.clone(),
            attempt_timeout: Duration::from_secs(self.inference_timeout_secs),
            max_attempts: self.inference_max_attempts,
            retry_backoff: Duration::from_millis(self.inference_retry_backoff_ms),
            retry_policy: if self.retry_client_errors {
                RetryPolicy::All
            } else {
                RetryPolicy::SkipClientErrors
            },
            ..InferenceConfig::default()
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_concurrent_jobs: self.max_concurrent_jobs,
        }
    }
}
