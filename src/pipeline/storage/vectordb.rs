use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::types::{ScoredPassage, TextChunk, VectorSearch};
use super::StorageError;

/// Collection name recorded in every snapshot.
pub const COLLECTION_NAME: &str = "cpic_guidelines";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// On-disk form of the reference index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub collection: String,
    pub embedding_model: String,
    /// Hex SHA-256 of the corpus the entries were built from.
    pub corpus_sha256: String,
    pub built_at: DateTime<Utc>,
    pub entries: Vec<IndexEntry>,
}

/// Brute-force cosine index over embedded corpus chunks, persisted as JSON.
///
/// Read-only once built; the corpus is small enough that a linear scan
/// beats any approximate structure.
#[derive(Debug, Clone)]
pub struct PersistentVectorIndex {
    snapshot: IndexSnapshot,
}

impl PersistentVectorIndex {
    /// Pair chunks with their embeddings. Ids are the chunk indices.
    pub fn build(
        embedding_model: &str,
        corpus_sha256: &str,
        chunks: &[TextChunk],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, StorageError> {
        if chunks.len() != embeddings.len() {
            return Err(StorageError::VectorDb(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        if let Some(first) = embeddings.first() {
            if embeddings.iter().any(|e| e.len() != first.len()) {
                return Err(StorageError::VectorDb(
                    "Embeddings have inconsistent dimensions".into(),
                ));
            }
        }

        let entries = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry {
                id: chunk.chunk_index.to_string(),
                text: chunk.content.clone(),
                embedding,
            })
            .collect();

        Ok(Self {
            snapshot: IndexSnapshot {
                collection: COLLECTION_NAME.to_string(),
                embedding_model: embedding_model.to_string(),
                corpus_sha256: corpus_sha256.to_string(),
                built_at: Utc::now(),
                entries,
            },
        })
    }

    /// Read a persisted index. A missing file is `Ok(None)`.
    pub async fn load(path: &Path) -> Result<Option<Self>, StorageError> {
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: IndexSnapshot = serde_json::from_str(&json).map_err(|e| {
            StorageError::VectorDb(format!("Corrupt index {}: {e}", path.display()))
        })?;
        Ok(Some(Self { snapshot }))
    }

    /// Write the snapshot next to `path` and rename it into place.
    pub async fn save(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec(&self.snapshot)
            .map_err(|e| StorageError::VectorDb(e.to_string()))?;
        let staged = path.with_extension("json.tmp");
        tokio::fs::write(&staged, json).await?;
        tokio::fs::rename(&staged, path).await?;
        Ok(())
    }

    pub fn embedding_model(&self) -> &str {
        &self.snapshot.embedding_model
    }

    pub fn corpus_sha256(&self) -> &str {
        &self.snapshot.corpus_sha256
    }
}

impl VectorSearch for PersistentVectorIndex {
    fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<ScoredPassage> {
        let mut scored: Vec<(f32, &IndexEntry)> = self
            .snapshot
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query_embedding, &entry.embedding), entry))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(top_k)
            .map(|(score, entry)| ScoredPassage {
                id: entry.id.clone(),
                text: entry.text.clone(),
                score,
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.snapshot.entries.len()
    }
}

/// Hex SHA-256 of the corpus text.
pub fn corpus_digest(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
