
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{LazyLoad, SearchError};
use crate::embeddings::{Chunk, Embedder, EmbeddingStore, cosine_similarity};
use crate::{DocsError, Result};

/// Default number of chunks returned by semantic search
pub const DEFAULT_TOP_K: usize = 4;

/// A chunk with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub score: f32,
}

/// Anything that can answer a semantic query. The search session is written
/// against this so it can be driven without a real embedding model.
#[async_trait]
pub trait SemanticSearcher: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>, SearchError>;
}

struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
    store: EmbeddingStore,
}

/// Ranks documentation chunks against a live query by cosine similarity.
///
/// The embedder readiness check and the store load run together on the first
/// search and are shared by every later one.
pub struct SemanticRanker {
    index: LazyLoad<SemanticIndex>,
}

impl SemanticRanker {
    /// Create a ranker whose store comes from `load_store` on first use
    #[inline]
    pub fn new<F, Fut>(embedder: Arc<dyn Embedder>, load_store: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<EmbeddingStore>> + Send + 'static,
    {
        let load_store = Arc::new(load_store);
        let index = LazyLoad::new(move || {
            let embedder = Arc::clone(&embedder);
            let load_store = Arc::clone(&load_store);
            async move {
                let (_, store) = tokio::try_join!(embedder.prepare(), load_store())?;
                store.validate_against(embedder.model_id(), embedder.dimension())?;
                info!(
                    "Semantic search ready: {} chunks, model {}",
                    store.len(),
                    embedder.model_id()
                );
                Ok::<_, DocsError>(SemanticIndex { embedder, store })
            }
        });
        Self { index }
    }

    /// Create a ranker reading the store file at `path` on first use
    #[inline]
    pub fn from_path(embedder: Arc<dyn Embedder>, path: PathBuf) -> Self {
        Self::new(embedder, move || {
            let path = path.clone();
            async move { EmbeddingStore::load(&path).await }
        })
    }

    /// Load the embedder and store now instead of on the first search
    #[inline]
    pub async fn initialize(&self) -> Result<(), SearchError> {
        self.index.get().await.map(|_| ()).map_err(into_search_error)
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.index.is_loaded()
    }

    /// Number of chunks in the loaded store, if it has been loaded
    #[inline]
    pub async fn corpus_size(&self) -> Result<usize, SearchError> {
        let index = self.index.get().await.map_err(into_search_error)?;
        Ok(index.store.len())
    }

    /// Return at most `top_k` chunks ordered by descending similarity to `query`.
    ///
    /// A blank query or an empty store yields an empty list.
    #[inline]
    pub async fn rank(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let index = self.index.get().await.map_err(into_search_error)?;
        if index.store.is_empty() {
            debug!("Embedding store is empty, nothing to rank");
            return Ok(Vec::new());
        }

        let query_vector = index.embedder.embed(query).await.map_err(|e| {
            warn!("Failed to embed query: {}", e);
            SearchError::EmbeddingsUnavailable(e.to_string())
        })?;

        Ok(rank_vector(&query_vector, &index.store.chunks, top_k))
    }
}

#[async_trait]
impl SemanticSearcher for SemanticRanker {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>, SearchError> {
        self.rank(query, top_k).await
    }
}

fn into_search_error(error: DocsError) -> SearchError {
    match error {
        DocsError::Search(error) => error,
        other => {
            warn!("Semantic search unavailable: {}", other);
            SearchError::EmbeddingsUnavailable(other.to_string())
        }
    }
}

/// Score every chunk against a normalized query vector and keep the best `top_k`.
///
/// Equal scores keep corpus order. A NaN score ranks last.
#[inline]
pub fn rank_vector(query: &[f32], chunks: &[Chunk], top_k: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<(usize, f32)> = chunks
        .iter()
        .enumerate()
        .map(|(idx, chunk)| {
            let score = cosine_similarity(query, &chunk.embedding);
            (idx, if score.is_nan() { f32::NEG_INFINITY } else { score })
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(idx, score)| ScoredChunk {
            chunk: chunks[idx].clone(),
            score,
        })
        .collect()
}
