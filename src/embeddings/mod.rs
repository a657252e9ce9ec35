// Embeddings module
// Embedder abstraction, Ollama integration, the precomputed chunk store and doc chunking

pub mod chunking;
pub mod ollama;
pub mod store;


use async_trait::async_trait;

use crate::Result;

pub use chunking::{ChunkingConfig, DocChunk, chunk_document};
pub use ollama::OllamaEmbedder;
pub use store::{Chunk, EmbeddingStore};

/// Default character budget for text handed to the embedder
pub const DEFAULT_MAX_INPUT_CHARS: usize = 512;

/// Maps text to a fixed-length, unit-length vector.
///
/// Implementations are expected to be cheap to share; the semantic ranker holds one
/// behind an `Arc` for the whole session.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the model producing the vectors. Stored alongside
    /// precomputed embeddings so a mismatch can be detected at load time.
    fn model_id(&self) -> &str;

    /// Length of every vector returned by [`Embedder::embed`]
    fn dimension(&self) -> usize;

    /// One-time readiness check (model reachable and available)
    async fn prepare(&self) -> Result<()>;

    /// Embed a single text, returning a normalized vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts in order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Scale a vector to unit length. The zero vector is returned unchanged.
#[inline]
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}

/// Cosine similarity of two unit vectors, which reduces to their dot product
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Truncate to at most `max_chars` characters without splitting a code point
#[inline]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text.get(..idx).unwrap_or(text),
        None => text,
    }
}
