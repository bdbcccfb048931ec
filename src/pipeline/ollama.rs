use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default local Ollama daemon.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Cannot connect to Ollama at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Ollama returned error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Unexpected Ollama response: {0}")]
    ResponseParsing(String),
}

/// Sampling options forwarded to `/api/generate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
}

/// Body of a non-streaming `/api/generate` call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    pub stream: bool,
    /// `"json"` constrains the model to emit a JSON document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct VersionResponse {
    version: String,
}

/// Async HTTP client for a local Ollama daemon.
///
/// Every request carries the client timeout; dropping a pending future
/// aborts the underlying connection.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, OllamaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OllamaError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    /// Non-streaming generation; returns the raw `response` text.
    pub async fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, OllamaError> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let parsed: GenerateResponse = Self::read_json(response).await?;
        Ok(parsed.response)
    }

    /// Embed a batch of texts with `model`, one vector per input, in order.
    pub async fn embed(&self, model: &str, input: &[String]) -> Result<Vec<Vec<f32>>, OllamaError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = EmbedRequest { model, input };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let parsed: EmbedResponse = Self::read_json(response).await?;
        if parsed.embeddings.len() != input.len() {
            return Err(OllamaError::ResponseParsing(format!(
                "expected {} embeddings, got {}",
                input.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings)
    }

    /// Daemon version, used as a reachability probe.
    pub async fn version(&self) -> Result<String, OllamaError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let parsed: VersionResponse = Self::read_json(response).await?;
        Ok(parsed.version)
    }

    fn map_send_error(&self, e: reqwest::Error) -> OllamaError {
        if e.is_connect() {
            OllamaError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            OllamaError::Timeout(self.timeout_secs)
        } else {
            OllamaError::Http(e.to_string())
        }
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, OllamaError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| OllamaError::ResponseParsing(e.to_string()))
    }
}
