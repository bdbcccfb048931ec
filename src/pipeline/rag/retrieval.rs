use std::future::Future;
use std::path::PathBuf;

use tokio::sync::OnceCell;

use super::types::{IndexStatus, RetrievedContext};
use crate::pipeline::storage::chunker::ChunkingStrategy;
use crate::pipeline::storage::types::{EmbeddingModel, VectorSearch};
use crate::pipeline::storage::vectordb::{corpus_digest, PersistentVectorIndex};
use crate::pipeline::storage::StorageError;

/// Passages returned per query unless the caller asks otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Source of reference passages for a free-text query.
///
/// Never fails: every problem is reported through the context status.
pub trait ContextSource: Send + Sync {
    fn retrieve_context(
        &self,
        query: &str,
        top_k: usize,
    ) -> impl Future<Output = RetrievedContext> + Send;

    fn index_status(&self) -> IndexStatus {
        IndexStatus::NotInitialized
    }
}

/// Where the corpus lives and how it is indexed.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub corpus_path: PathBuf,
    /// `None` keeps the index in memory only.
    pub index_path: Option<PathBuf>,
    pub chunking: ChunkingStrategy,
}

enum IndexState {
    Ready(PersistentVectorIndex),
    Unavailable(String),
}

/// Semantic retrieval over the reference corpus.
///
/// The index is built on first use and shared by every later query.
/// Concurrent first callers wait on the same initialization; a failed
/// initialization is not retried for the life of the retriever.
pub struct ContextRetriever<E: EmbeddingModel> {
    embedder: E,
    config: RetrieverConfig,
    index: OnceCell<IndexState>,
}

impl<E: EmbeddingModel> ContextRetriever<E> {
    pub fn new(embedder: E, config: RetrieverConfig) -> Self {
        Self {
            embedder,
            config,
            index: OnceCell::new(),
        }
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Force initialization now instead of on the first query.
    pub async fn warm_up(&self) -> IndexStatus {
        self.index().await;
        self.index_status()
    }

    async fn index(&self) -> &IndexState {
        self.index.get_or_init(|| self.initialize()).await
    }

    async fn initialize(&self) -> IndexState {
        match self.load_or_build().await {
            Ok(index) => IndexState::Ready(index),
            Err(e) => {
                tracing::warn!(error = %e, "Reference index unavailable");
                IndexState::Unavailable(e.to_string())
            }
        }
    }

    async fn load_or_build(&self) -> Result<PersistentVectorIndex, StorageError> {
        if let Some(path) = &self.config.index_path {
            if let Some(existing) = PersistentVectorIndex::load(path).await? {
                if !existing.is_empty() {
                    return self.reuse(existing).await;
                }
            }
        }

        let corpus = self.read_corpus().await?;
        let chunks = self.config.chunking.chunker().chunk(&corpus);
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();

        tracing::info!(
            passages = texts.len(),
            chunking = %self.config.chunking,
            model = %self.embedder.model_name(),
            "Ingesting reference corpus"
        );

        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_batch(&texts).await?
        };
        let index = PersistentVectorIndex::build(
            self.embedder.model_name(),
            &corpus_digest(&corpus),
            &chunks,
            embeddings,
        )?;

        match &self.config.index_path {
            Some(path) if !index.is_empty() => {
                if let Err(e) = index.save(path).await {
                    tracing::warn!(path = %path.display(), error = %e, "Could not persist reference index");
                } else {
                    tracing::info!(path = %path.display(), "Reference index persisted");
                }
            }
            _ => {}
        }

        Ok(index)
    }

    async fn reuse(
        &self,
        existing: PersistentVectorIndex,
    ) -> Result<PersistentVectorIndex, StorageError> {
        if existing.embedding_model() != self.embedder.model_name() {
            return Err(StorageError::ModelMismatch {
                index_model: existing.embedding_model().to_string(),
                configured: self.embedder.model_name().to_string(),
            });
        }

        if let Ok(corpus) = tokio::fs::read_to_string(&self.config.corpus_path).await {
            if corpus_digest(&corpus) != existing.corpus_sha256() {
                tracing::warn!(
                    corpus = %self.config.corpus_path.display(),
                    "Corpus changed since the index was built; delete the index to re-ingest"
                );
            }
        }

        tracing::info!(passages = existing.len(), "Reusing persisted reference index");
        Ok(existing)
    }

    async fn read_corpus(&self) -> Result<String, StorageError> {
        let path = &self.config.corpus_path;
        tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::CorpusNotFound(path.clone())
            } else {
                StorageError::Io(e)
            }
        })
    }
}

impl<E: EmbeddingModel> ContextSource for ContextRetriever<E> {
    async fn retrieve_context(&self, query: &str, top_k: usize) -> RetrievedContext {
        let index = match self.index().await {
            IndexState::Ready(index) => index,
            IndexState::Unavailable(_) => return RetrievedContext::unavailable(),
        };

        if index.is_empty() || top_k == 0 {
            return RetrievedContext::found(Vec::new());
        }

        match self.embedder.embed(query).await {
            Ok(vector) => RetrievedContext::found(index.search(&vector, top_k)),
            Err(e) => {
                tracing::warn!(error = %e, "Query embedding failed");
                RetrievedContext::failed(e.to_string())
            }
        }
    }

    fn index_status(&self) -> IndexStatus {
        match self.index.get() {
            None => IndexStatus::NotInitialized,
            Some(IndexState::Ready(index)) => IndexStatus::Ready {
                passages: index.len(),
                embedding_model: index.embedding_model().to_string(),
            },
            Some(IndexState::Unavailable(reason)) => IndexStatus::Unavailable {
                reason: reason.clone(),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::pipeline::rag::types::ContextStatus;
    use crate::pipeline::storage::embedder::HashEmbedder;

    pub(crate) const CORPUS: &str = "\
CPIC: CYP2C19 poor metabolizers should avoid clopidogrel due to reduced active metabolite.
CPIC: CYP2C9 poor metabolizers need a reduced warfarin starting dose.

CPIC: TPMT poor metabolizers require drastically reduced thiopurine doses.
CPIC: DPYD poor metabolizers should avoid fluorouracil.
";

    /// Hash embedder that counts calls and can be slowed down or broken.
    struct CountingEmbedder {
        inner: HashEmbedder,
        pub batches: AtomicUsize,
        pub queries: AtomicUsize,
        delay: Duration,
        fail_queries: bool,
        fail_batches: bool,
    }

    impl CountingEmbedder {
        pub fn new() -> Self {
            Self {
                inner: HashEmbedder::new(),
                batches: AtomicUsize::new(0),
                queries: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail_queries: false,
                fail_batches: false,
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl EmbeddingModel for CountingEmbedder {
        fn model_name(&self) -> &str {
            self.inner.model_name()
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if self.fail_queries {
                return Err(StorageError::EmbeddingBackend("connection refused".into()));
            }
            self.inner.embed(text).await
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StorageError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail_batches {
                return Err(StorageError::EmbeddingBackend("connection refused".into()));
            }
            self.inner.embed_batch(texts).await
        }
    }

    fn write_corpus(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("cpic_guidelines.txt");
        std::fs::write(&path, text).unwrap();
        path
    }

    fn retriever<E: EmbeddingModel>(
        embedder: E,
        corpus_path: PathBuf,
        index_path: Option<PathBuf>,
    ) -> ContextRetriever<E> {
        ContextRetriever::new(
            embedder,
            RetrieverConfig {
                corpus_path,
                index_path,
                chunking: ChunkingStrategy::Line,
            },
        )
    }

    #[tokio::test]
    async fn retrieves_most_relevant_line_first() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path(), CORPUS);
        let r = retriever(HashEmbedder::new(), corpus, None);

        let ctx = r
            .retrieve_context("CPIC guideline for Clopidogrel and CYP2C19 phenotype Poor Metabolizer", 3)
            .await;
        assert_eq!(ctx.status, ContextStatus::Found);
        assert_eq!(ctx.passages.len(), 3);
        assert!(ctx.passages[0].text.contains("clopidogrel"));
        assert!(ctx.passages[0].score >= ctx.passages[1].score);
        assert!(ctx.passages[1].score >= ctx.passages[2].score);
    }

    #[tokio::test]
    async fn line_chunking_indexes_each_non_empty_line() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path(), CORPUS);
        let r = retriever(HashEmbedder::new(), corpus, None);

        match r.warm_up().await {
            IndexStatus::Ready { passages, .. } => assert_eq!(passages, 4),
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn top_k_is_capped_by_corpus_size() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path(), CORPUS);
        let r = retriever(HashEmbedder::new(), corpus, None);
        assert_eq!(r.retrieve_context("warfarin", 10).await.passages.len(), 4);
    }

    #[tokio::test]
    async fn missing_corpus_yields_not_initialized_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let r = retriever(HashEmbedder::new(), dir.path().join("absent.txt"), None);

        let ctx = r.retrieve_context("anything", 3).await;
        assert_eq!(ctx.status, ContextStatus::Unavailable);
        assert_eq!(ctx.prompt_text(), "RAG Engine not initialized.");
        assert!(matches!(r.index_status(), IndexStatus::Unavailable { .. }));
    }

    #[tokio::test]
    async fn embedding_backend_down_at_ingestion_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path(), CORPUS);
        let mut embedder = CountingEmbedder::new();
        embedder.fail_batches = true;
        let r = retriever(embedder, corpus, None);

        let ctx = r.retrieve_context("clopidogrel", 3).await;
        assert_eq!(ctx.prompt_text(), "RAG Engine not initialized.");

        // Failure is permanent: no second ingestion attempt.
        r.retrieve_context("clopidogrel", 3).await;
        assert_eq!(r.embedder().batches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_corpus_yields_no_matches_and_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path(), "\n   \n");
        let index_path = dir.path().join("index.json");
        let r = retriever(CountingEmbedder::new(), corpus, Some(index_path.clone()));

        let ctx = r.retrieve_context("clopidogrel", 3).await;
        assert_eq!(ctx.prompt_text(), "No relevant guidelines found.");
        assert!(!index_path.exists());
        assert_eq!(r.embedder().batches.load(Ordering::SeqCst), 0);
        assert_eq!(r.embedder().queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn query_embedding_failure_yields_error_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path(), CORPUS);
        let mut embedder = CountingEmbedder::new();
        embedder.fail_queries = true;
        let r = retriever(embedder, corpus, None);

        let ctx = r.retrieve_context("clopidogrel", 3).await;
        assert!(matches!(ctx.status, ContextStatus::Failed(_)));
        assert!(ctx.prompt_text().starts_with("Error retrieving context: "));
        assert!(ctx.prompt_text().contains("connection refused"));
    }

    #[tokio::test]
    async fn concurrent_first_queries_ingest_once() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path(), CORPUS);
        let embedder = CountingEmbedder::new().slow(Duration::from_millis(50));
        let r = Arc::new(retriever(embedder, corpus, Some(dir.path().join("index.json"))));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = Arc::clone(&r);
                tokio::spawn(async move { r.retrieve_context("warfarin dose", 2).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().status, ContextStatus::Found);
        }

        assert_eq!(r.embedder().batches.load(Ordering::SeqCst), 1);
        assert_eq!(r.embedder().queries.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn persisted_index_is_reused_without_reembedding() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path(), CORPUS);
        let index_path = dir.path().join("index").join("cpic.json");

        let first = retriever(CountingEmbedder::new(), corpus.clone(), Some(index_path.clone()));
        first.warm_up().await;
        assert_eq!(first.embedder().batches.load(Ordering::SeqCst), 1);
        assert!(index_path.exists());

        let second = retriever(CountingEmbedder::new(), corpus, Some(index_path));
        let ctx = second.retrieve_context("thiopurine TPMT", 1).await;
        assert_eq!(second.embedder().batches.load(Ordering::SeqCst), 0);
        assert!(ctx.passages[0].text.contains("TPMT"));
    }

    #[tokio::test]
    async fn changed_corpus_still_reuses_index() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path(), CORPUS);
        let index_path = dir.path().join("index.json");

        retriever(HashEmbedder::new(), corpus.clone(), Some(index_path.clone()))
            .warm_up()
            .await;
        write_corpus(dir.path(), "CPIC: a completely different guideline.\n");

        let reopened = retriever(CountingEmbedder::new(), corpus, Some(index_path));
        match reopened.warm_up().await {
            IndexStatus::Ready { passages, .. } => assert_eq!(passages, 4),
            other => panic!("expected ready, got {other:?}"),
        }
        assert_eq!(reopened.embedder().batches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn index_from_other_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path(), CORPUS);
        let index_path = dir.path().join("index.json");

        retriever(HashEmbedder::new(), corpus.clone(), Some(index_path.clone()))
            .warm_up()
            .await;

        let other = retriever(HashEmbedder::with_dimension(64), corpus, Some(index_path));
        let ctx = other.retrieve_context("clopidogrel", 3).await;
        assert_eq!(ctx.status, ContextStatus::Unavailable);
        match other.index_status() {
            IndexStatus::Unavailable { reason } => assert!(reason.contains("hash-256")),
            status => panic!("expected unavailable, got {status:?}"),
        }
    }

    #[tokio::test]
    async fn corrupt_index_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path(), CORPUS);
        let index_path = dir.path().join("index.json");
        std::fs::write(&index_path, "not an index").unwrap();

        let r = retriever(HashEmbedder::new(), corpus, Some(index_path));
        assert_eq!(
            r.retrieve_context("clopidogrel", 3).await.status,
            ContextStatus::Unavailable
        );
    }

    #[tokio::test]
    async fn paragraph_chunking_groups_lines() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = write_corpus(dir.path(), CORPUS);
        let r = ContextRetriever::new(
            HashEmbedder::new(),
            RetrieverConfig {
                corpus_path: corpus,
                index_path: None,
                chunking: ChunkingStrategy::Paragraph,
            },
        );

        match r.warm_up().await {
            IndexStatus::Ready { passages, .. } => assert_eq!(passages, 2),
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_before_first_query_is_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let r = retriever(HashEmbedder::new(), write_corpus(dir.path(), CORPUS), None);
        assert_eq!(r.index_status(), IndexStatus::NotInitialized);
    }
}
