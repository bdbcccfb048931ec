use super::types::EmbeddingModel;
use super::StorageError;
use crate::pipeline::ollama::OllamaClient;

/// Dimension of the offline hashing embedder.
pub const HASH_EMBEDDING_DIM: usize = 256;

/// Texts sent per `/api/embed` call during ingestion.
const OLLAMA_EMBED_BATCH: usize = 64;

/// Embeddings from a local Ollama daemon (`/api/embed`).
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

impl EmbeddingModel for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| StorageError::Embedding("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StorageError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(OLLAMA_EMBED_BATCH) {
            let embedded = self
                .client
                .embed(&self.model, batch)
                .await
                .map_err(|e| StorageError::EmbeddingBackend(e.to_string()))?;
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}

// ═══════════════════════════════════════════════════════════
// ONNX Embedder: behind `onnx-embeddings` feature
// ═══════════════════════════════════════════════════════════

#[cfg(feature = "onnx-embeddings")]
mod onnx {
    use super::{EmbeddingModel, StorageError};
    use ort::session::Session;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    /// Sentence embeddings computed in-process with ONNX Runtime.
    ///
    /// Requires `model.onnx` and `tokenizer.json` in the model directory.
    /// Output is mean-pooled over the attention mask and L2-normalized, so
    /// any sentence-transformers export (all-MiniLM, bge-small) works.
    pub struct OnnxEmbedder {
        inner: Arc<Inner>,
        name: String,
    }

    struct Inner {
        session: Mutex<Session>,
        tokenizer: tokenizers::Tokenizer,
    }

    impl OnnxEmbedder {
        pub fn load(model_dir: &Path) -> Result<Self, StorageError> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(StorageError::ModelNotFound(model_path));
            }
            if !tokenizer_path.exists() {
                return Err(StorageError::ModelNotFound(tokenizer_path));
            }

            let session = Session::builder()
                .map_err(|e: ort::Error| StorageError::ModelInit(e.to_string()))?
                .with_intra_threads(2)
                .map_err(|e: ort::Error| StorageError::ModelInit(e.to_string()))?
                .commit_from_file(&model_path)
                .map_err(|e: ort::Error| StorageError::ModelInit(format!("ONNX load failed: {e}")))?;

            let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| StorageError::ModelInit(format!("Tokenizer load failed: {e}")))?;

            let name = format!(
                "onnx:{}",
                model_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            );
            tracing::info!(model = %name, dir = %model_dir.display(), "ONNX embedder loaded");

            Ok(Self {
                inner: Arc::new(Inner {
                    session: Mutex::new(session),
                    tokenizer,
                }),
                name,
            })
        }

        async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, StorageError> {
            let inner = Arc::clone(&self.inner);
            tokio::task::spawn_blocking(move || texts.iter().map(|t| inner.infer(t)).collect())
                .await
                .map_err(|e| StorageError::Embedding(format!("Inference task failed: {e}")))?
        }
    }

    impl Inner {
        fn infer(&self, text: &str) -> Result<Vec<f32>, StorageError> {
            use ort::value::TensorRef;

            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| StorageError::Tokenization(e.to_string()))?;

            let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            let attention_mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect();
            let token_type_ids: Vec<i64> =
                encoding.get_type_ids().iter().map(|&t| t as i64).collect();
            let seq_len = input_ids.len();

            let to_array = |v: Vec<i64>| {
                ndarray::Array2::from_shape_vec((1, seq_len), v)
                    .map_err(|e| StorageError::Embedding(e.to_string()))
            };
            let ids_array = to_array(input_ids)?;
            let mask_array = to_array(attention_mask.clone())?;
            let type_array = to_array(token_type_ids)?;

            let ids_tensor = TensorRef::from_array_view(&ids_array)
                .map_err(|e| StorageError::Embedding(e.to_string()))?;
            let mask_tensor = TensorRef::from_array_view(&mask_array)
                .map_err(|e| StorageError::Embedding(e.to_string()))?;
            let type_tensor = TensorRef::from_array_view(&type_array)
                .map_err(|e| StorageError::Embedding(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| StorageError::Embedding("Session lock poisoned".to_string()))?;

            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
                .map_err(|e| StorageError::Embedding(format!("ONNX inference failed: {e}")))?;

            // Output shape: [1, seq_len, hidden]
            let (shape, output_data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| StorageError::Embedding(format!("Output extraction: {e}")))?;
            if shape.len() != 3 || shape[1] as usize != seq_len {
                return Err(StorageError::Embedding(format!(
                    "Unexpected output shape: {shape:?}, expected [1, {seq_len}, hidden]"
                )));
            }
            let hidden = shape[2] as usize;

            let mut pooled = vec![0.0f32; hidden];
            let mut mask_sum = 0.0f32;
            for (token_idx, &mask) in attention_mask.iter().enumerate() {
                let mask = mask as f32;
                mask_sum += mask;
                let offset = token_idx * hidden;
                for (dim_idx, p) in pooled.iter_mut().enumerate() {
                    *p += output_data[offset + dim_idx] * mask;
                }
            }
            if mask_sum > 0.0 {
                for val in &mut pooled {
                    *val /= mask_sum;
                }
            }

            super::l2_normalize(&mut pooled);
            Ok(pooled)
        }
    }

    impl EmbeddingModel for OnnxEmbedder {
        fn model_name(&self) -> &str {
            &self.name
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
            let mut vectors = self.run(vec![text.to_string()]).await?;
            vectors
                .pop()
                .ok_or_else(|| StorageError::Embedding("no embedding produced".to_string()))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StorageError> {
            self.run(texts.to_vec()).await
        }
    }
}

#[cfg(feature = "onnx-embeddings")]
pub use onnx::OnnxEmbedder;

/// Offline bag-of-words embedder.
///
/// Each lowercase alphanumeric token is hashed into one of `dimension`
/// buckets, so texts sharing vocabulary land close together. Runs without
/// any model, which makes it the embedder of choice for tests and
/// air-gapped setups.
pub struct HashEmbedder {
    dimension: usize,
    name: String,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(HASH_EMBEDDING_DIM)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            name: format!("hash-{dimension}"),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        Ok(hashed_vector(text, self.dimension))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StorageError> {
        Ok(texts
            .iter()
            .map(|t| hashed_vector(t, self.dimension))
            .collect())
    }
}

fn hashed_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dim];

    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let bucket = (fnv1a(&token.to_lowercase()) % dim as u64) as usize;
        vec[bucket] += 1.0;
    }

    l2_normalize(&mut vec);
    vec
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vec.iter_mut() {
            *val /= norm;
        }
    }
}

/// Embedding backend selected at startup.
pub enum Embedder {
    Ollama(OllamaEmbedder),
    Hash(HashEmbedder),
    #[cfg(feature = "onnx-embeddings")]
    Onnx(OnnxEmbedder),
}

impl EmbeddingModel for Embedder {
    fn model_name(&self) -> &str {
        match self {
            Self::Ollama(e) => e.model_name(),
            Self::Hash(e) => e.model_name(),
            #[cfg(feature = "onnx-embeddings")]
            Self::Onnx(e) => e.model_name(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        match self {
            Self::Ollama(e) => e.embed(text).await,
            Self::Hash(e) => e.embed(text).await,
            #[cfg(feature = "onnx-embeddings")]
            Self::Onnx(e) => e.embed(text).await,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StorageError> {
        match self {
            Self::Ollama(e) => e.embed_batch(texts).await,
            Self::Hash(e) => e.embed_batch(texts).await,
            #[cfg(feature = "onnx-embeddings")]
            Self::Onnx(e) => e.embed_batch(texts).await,
        }
    }
}
