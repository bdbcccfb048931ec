//! Generation backend adapter for a local Ollama daemon.

use super::generator::LlmGenerate;
use super::RagError;
use crate::pipeline::ollama::{GenerateOptions, GenerateRequest, OllamaClient};

/// Sampling temperature for explanations.
pub const EXPLANATION_TEMPERATURE: f32 = 0.2;

/// Explanation generator backed by Ollama `/api/generate`.
///
/// Requests are non-streaming, JSON-constrained and low temperature.
pub struct OllamaGenerator {
    client: OllamaClient,
    model: String,
}

impl OllamaGenerator {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

impl LlmGenerate for OllamaGenerator {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, RagError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system: Some(system),
            stream: false,
            format: Some("json"),
            options: Some(GenerateOptions {
                temperature: EXPLANATION_TEMPERATURE,
            }),
        };
        Ok(self.client.generate(&request).await?)
    }

    async fn probe(&self) -> Result<(), RagError> {
        let version = self.client.version().await?;
        tracing::debug!(%version, model = %self.model, "Ollama reachable");
        Ok(())
    }
}
