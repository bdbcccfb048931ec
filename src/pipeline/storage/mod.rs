pub mod types;
pub mod chunker;
pub mod embedder;
pub mod vectordb;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Knowledge base not found at {0}")]
    CorpusNotFound(PathBuf),

    #[error("Vector index error: {0}")]
    VectorDb(String),

    #[error("Index built with embedding model {index_model}, configured model is {configured}")]
    ModelMismatch { index_model: String, configured: String },

    #[error("Embedding backend unavailable: {0}")]
    EmbeddingBackend(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Embedding model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Embedding model initialization: {0}")]
    ModelInit(String),

    #[error("Tokenization error: {0}")]
    Tokenization(String),
}
