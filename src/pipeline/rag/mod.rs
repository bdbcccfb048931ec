pub mod types;
pub mod retrieval;
pub mod prompt;
pub mod generator;
pub mod ollama;
pub mod orchestrator;

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::ollama::OllamaError;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Generation backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl From<OllamaError> for RagError {
    fn from(e: OllamaError) -> Self {
        match e {
            OllamaError::ResponseParsing(msg) => RagError::ResponseParsing(msg),
            other => RagError::BackendUnavailable(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExplainError {
    #[error("Explanation not ready within {0:?}")]
    DeadlineExceeded(Duration),
}
