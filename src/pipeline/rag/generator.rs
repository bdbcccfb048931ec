use std::future::Future;

use super::prompt::{build_explanation_prompt, ExplanationRequest, EXPLANATION_SYSTEM_PROMPT};
use super::types::RetrievedContext;
use super::RagError;
use crate::models::explanation::Explanation;

/// Text generation backend.
pub trait LlmGenerate: Send + Sync {
    fn generate(
        &self,
        system: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, RagError>> + Send;

    /// Cheap reachability probe for health reporting.
    fn probe(&self) -> impl Future<Output = Result<(), RagError>> + Send;
}

/// Turns a verdict plus retrieved context into an [`Explanation`].
///
/// Never fails: backend errors and malformed output become the fixed
/// fallback explanations.
pub struct ExplanationGenerator<G: LlmGenerate> {
    llm: G,
}

impl<G: LlmGenerate> ExplanationGenerator<G> {
    pub fn new(llm: G) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &G {
        &self.llm
    }

    pub async fn generate(
        &self,
        request: &ExplanationRequest<'_>,
        context: &RetrievedContext,
    ) -> Explanation {
        let prompt = build_explanation_prompt(request, &context.prompt_text());

        let outcome = match self.llm.generate(EXPLANATION_SYSTEM_PROMPT, &prompt).await {
            Ok(text) => parse_explanation(&text),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(explanation) => explanation,
            Err(RagError::BackendUnavailable(reason)) => {
                tracing::warn!(drug = %request.drug, %reason, "Generation backend unavailable");
                Explanation::backend_unavailable(reason)
            }
            Err(RagError::ResponseParsing(reason)) => {
                tracing::warn!(drug = %request.drug, %reason, "Generated explanation unparseable");
                Explanation::unparseable()
            }
        }
    }
}

/// Strict parse: a JSON object with exactly the four string fields.
pub fn parse_explanation(text: &str) -> Result<Explanation, RagError> {
    serde_json::from_str(text.trim()).map_err(|e| RagError::ResponseParsing(e.to_string()))
}
