pub mod api;
pub mod config;
pub mod engine;
pub mod models;
pub mod pipeline;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::types::{ApiContext, ServiceRetriever};
use crate::config::{EmbedderKind, Settings};
use crate::pipeline::ollama::{OllamaClient, OllamaError};
use crate::pipeline::rag::ollama::OllamaGenerator;
use crate::pipeline::rag::orchestrator::ExplanationOrchestrator;
use crate::pipeline::rag::retrieval::RetrieverConfig;
use crate::pipeline::storage::embedder::{Embedder, HashEmbedder, OllamaEmbedder};
use crate::pipeline::storage::StorageError;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Reference(#[from] engine::ReferenceError),

    #[error("Cannot create Ollama client: {0}")]
    Ollama(#[from] OllamaError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ONNX embeddings requested but this build lacks the onnx-embeddings feature")]
    OnnxUnavailable,
}

/// Wire reference data, retrieval and generation into the shared API context.
///
/// Does not touch the corpus or the network; the index builds on first use
/// or on `warm_up`.
pub fn build_context(settings: &Settings) -> Result<ApiContext, StartupError> {
    let evaluator = engine::load_evaluator(settings.reference_dir.as_deref())?;

    let retriever = ServiceRetriever::new(
        build_embedder(settings)?,
        RetrieverConfig {
            corpus_path: settings.corpus_path.clone(),
            index_path: settings.index_path.clone(),
            chunking: settings.chunking,
        },
    );

    let llm_client = OllamaClient::new(&settings.ollama_url, settings.llm_timeout_secs)?;
    let generator = OllamaGenerator::new(llm_client, &settings.llm_model);

    let orchestrator = ExplanationOrchestrator::new(evaluator, retriever, generator);
    Ok(ApiContext::new(
        Arc::new(orchestrator),
        settings.explain_deadline,
    ))
}

fn build_embedder(settings: &Settings) -> Result<Embedder, StartupError> {
    match settings.embedder {
        EmbedderKind::Ollama => {
            let client = OllamaClient::new(&settings.ollama_url, settings.embed_timeout_secs)?;
            Ok(Embedder::Ollama(OllamaEmbedder::new(
                client,
                &settings.embed_model,
            )))
        }
        EmbedderKind::Hash => Ok(Embedder::Hash(HashEmbedder::new())),
        #[cfg(feature = "onnx-embeddings")]
        EmbedderKind::Onnx => {
            use crate::pipeline::storage::embedder::OnnxEmbedder;
            Ok(Embedder::Onnx(OnnxEmbedder::load(&settings.onnx_model_dir)?))
        }
        #[cfg(not(feature = "onnx-embeddings"))]
        EmbedderKind::Onnx => Err(StartupError::OnnxUnavailable),
    }
}

/// Service entry point: configure, serve until Ctrl-C, then drain.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = Settings::from_env()?;
    tracing::info!(
        bind = %settings.bind,
        ollama_url = %settings.ollama_url,
        llm_model = %settings.llm_model,
        embedder = %settings.embedder,
        corpus = %settings.corpus_path.display(),
        "Configuration loaded"
    );

    let ctx = build_context(&settings)?;

    let orchestrator = Arc::clone(&ctx.orchestrator);
    tokio::spawn(async move {
        let status = orchestrator.retriever().warm_up().await;
        tracing::info!(?status, "Reference index warm-up finished");
    });

    let mut server = api::start_api_server(ctx, settings.bind).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.wait().await;
    Ok(())
}
