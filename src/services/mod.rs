pub mod extract;
pub mod inference;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod ollama;
pub mod orchestrator;
pub mod pdf;
pub mod prompt;
