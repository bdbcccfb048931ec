//! Liveness and readiness endpoints.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::pipeline::rag::generator::LlmGenerate;
use crate::pipeline::rag::retrieval::ContextSource;
use crate::pipeline::rag::types::IndexStatus;

/// Upper bound on the backend check, independent of the generation timeout.
pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Serialize)]
pub struct WelcomeResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub generation_backend: &'static str,
    pub index: IndexStatus,
}

/// `GET /`: static greeting.
pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to PharmaGuard API",
    })
}

/// `GET /api/v1/health`: reports the generation backend and guideline
/// index without triggering index construction.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let probe = ctx.orchestrator.generator().llm().probe();
    let generation_backend = match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
        Ok(Ok(())) => "reachable",
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "Generation backend probe failed");
            "unreachable"
        }
        Err(_) => {
            tracing::debug!(timeout = ?PROBE_TIMEOUT, "Generation backend probe timed out");
            "unreachable"
        }
    };

    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        generation_backend,
        index: ctx.orchestrator.retriever().index_status(),
    })
}
