use std::future::Future;

use serde::{Deserialize, Serialize};

use super::StorageError;

/// One independently embedded unit of the reference corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    pub chunk_index: usize,
    /// 1-based line of the corpus where the chunk starts.
    pub line_number: usize,
}

/// Chunking strategy trait
pub trait Chunker: Send + Sync {
    fn chunk(&self, text: &str) -> Vec<TextChunk>;
}

/// Embedding model abstraction.
///
/// The same model must embed the corpus at index time and the query at
/// search time; `model_name` is persisted with the index to enforce that.
pub trait EmbeddingModel: Send + Sync {
    fn model_name(&self) -> &str;

    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, StorageError>> + Send;

    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, StorageError>> + Send;
}

/// A passage returned by nearest-neighbor search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub id: String,
    pub text: String,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// Nearest-neighbor search over embedded passages.
pub trait VectorSearch: Send + Sync {
    /// Up to `top_k` passages, most similar first.
    fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<ScoredPassage>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
