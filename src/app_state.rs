use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::db::JobStore;
use crate::services::{orchestrator::JobOrchestrator, pdf::TextExtractor};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub orchestrator: JobOrchestrator,
    pub extractor: Arc<dyn TextExtractor>,
    pub tokens: Arc<TokenVerifier>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        store: Arc<dyn JobStore>,
        orchestrator: JobOrchestrator,
        extractor: impl TextExtractor + 'static,
        tokens: TokenVerifier,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            store,
            orchestrator,
            extractor: Arc::new(extractor),
            tokens: Arc::new(tokens),
            max_upload_bytes,
        }
    }
}
