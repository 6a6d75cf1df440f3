use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Mutex;

use crate::services::ollama::{BackendError, GenerateRequest, ModelBackend};

/// What the scripted backend does for one call.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Status(u16, String),
    /// Never answers; only a timeout ends the call.
    Hang,
    Panic,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

/// In-memory [`ModelBackend`] that replays a script of replies.
///
/// Rules matching the prompt take precedence over the script. Once the script
/// runs out the fallback reply is used for every further call.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Reply>>,
    rules: Vec<(String, Reply)>,
    fallback: Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Reply>) -> Self {
        let fallback = script
            .last()
            .cloned()
            .unwrap_or_else(|| Reply::text(""));
        Self {
            script: Mutex::new(script.into()),
            rules: Vec::new(),
            fallback,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(reply: Reply) -> Self {
        Self::new(vec![reply])
    }

    /// Answer with `reply` whenever the prompt contains `needle`.
    pub fn with_rule(mut self, needle: impl Into<String>, reply: Reply) -> Self {
        self.rules.push((needle.into(), reply));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_reply(&self, prompt: &str) -> Reply {
        if let Some((_, reply)) = self.rules.iter().find(|(needle, _)| prompt.contains(needle)) {
            return reply.clone();
        }
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        match self.next_reply(&request.prompt).await {
            Reply::Text(text) => Ok(text),
            Reply::Status(code, body) => Err(BackendError::Status {
                status: StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body,
            }),
            Reply::Hang => std::future::pending().await,
            Reply::Panic => panic!("scripted backend panic"),
        }
    }
}
