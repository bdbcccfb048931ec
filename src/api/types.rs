//! Shared state for the HTTP layer.

use std::sync::Arc;
use std::time::Duration;

use crate::engine::RiskEvaluator;
use crate::pipeline::rag::ollama::OllamaGenerator;
use crate::pipeline::rag::orchestrator::ExplanationOrchestrator;
use crate::pipeline::rag::retrieval::ContextRetriever;
use crate::pipeline::storage::embedder::Embedder;

/// Retriever wired to the configured embedding backend.
pub type ServiceRetriever = ContextRetriever<Embedder>;

/// Explanation pipeline as deployed: configured retriever plus Ollama generation.
pub type ServiceOrchestrator = ExplanationOrchestrator<ServiceRetriever, OllamaGenerator>;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub orchestrator: Arc<ServiceOrchestrator>,
    /// Upper bound on one explained evaluation; `None` relies on the
    /// backend timeouts alone.
    pub explain_deadline: Option<Duration>,
}

impl ApiContext {
    pub fn new(orchestrator: Arc<ServiceOrchestrator>, explain_deadline: Option<Duration>) -> Self {
        Self {
            orchestrator,
            explain_deadline,
        }
    }

    pub fn evaluator(&self) -> &RiskEvaluator {
        self.orchestrator.evaluator()
    }
}
