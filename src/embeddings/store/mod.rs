
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::search::SearchError;
use crate::{DocsError, Result};

/// A titled slice of documentation with its precomputed embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub title: String,
    pub text: String,
    pub source: String,
    pub url: String,
    pub embedding: Vec<f32>,
}

/// Precomputed embeddings for the documentation set.
///
/// Written as a versioned envelope recording the model that produced the vectors.
/// Bare JSON arrays of chunks (the older format) are still accepted; they carry no
/// model identifier, so only the vector length can be checked against the embedder.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingStore {
    pub model: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub chunks: Vec<Chunk>,
}

#[derive(Serialize, Deserialize)]
struct StoreEnvelope {
    model: String,
    dimension: usize,
    generated_at: DateTime<Utc>,
    chunks: Vec<Chunk>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoreFile {
    Versioned(StoreEnvelope),
    Legacy(Vec<Chunk>),
}

impl EmbeddingStore {
    #[inline]
    pub fn new(model: impl Into<String>, chunks: Vec<Chunk>) -> Self {
        Self {
            model: Some(model.into()),
            generated_at: Some(Utc::now()),
            chunks,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Vector length shared by every chunk, taken from the first one
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.chunks.first().map(|chunk| chunk.embedding.len())
    }

    #[inline]
    pub fn from_json(json: &str) -> Result<Self> {
        let store = match serde_json::from_str::<StoreFile>(json)? {
            StoreFile::Versioned(envelope) => {
                if let Some(chunk) = envelope
                    .chunks
                    .iter()
                    .find(|chunk| chunk.embedding.len() != envelope.dimension)
                {
                    return Err(SearchError::DimensionMismatch {
                        expected: envelope.dimension,
                        found: chunk.embedding.len(),
                    }
                    .into());
                }
                Self {
                    model: Some(envelope.model),
                    generated_at: Some(envelope.generated_at),
                    chunks: envelope.chunks,
                }
            }
            StoreFile::Legacy(chunks) => {
                warn!("Embedding store has no model identifier, only dimensions will be checked");
                Self {
                    model: None,
                    generated_at: None,
                    chunks,
                }
            }
        };
        Ok(store)
    }

    #[inline]
    pub fn to_json(&self) -> Result<String> {
        let envelope = StoreEnvelope {
            model: self.model.clone().unwrap_or_default(),
            dimension: self.dimension().unwrap_or_default(),
            generated_at: self.generated_at.unwrap_or_else(Utc::now),
            chunks: self.chunks.clone(),
        };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    #[inline]
    pub async fn load(path: &Path) -> Result<Self> {
        debug!("Loading embedding store from {}", path.display());
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            DocsError::Index(format!(
                "Failed to read embedding store {}: {}",
                path.display(),
                e
            ))
        })?;
        let store = Self::from_json(&json)?;
        info!(
            "Loaded {} chunks from {} (model: {})",
            store.len(),
            path.display(),
            store.model.as_deref().unwrap_or("unknown")
        );
        Ok(store)
    }

    #[inline]
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_json()?).await?;
        info!("Wrote {} embeddings to {}", self.len(), path.display());
        Ok(())
    }

    /// Check the store was produced by the same model the query embedder uses
    #[inline]
    pub fn validate_against(&self, model: &str, dimension: usize) -> Result<(), SearchError> {
        if let Some(stored) = self.model.as_deref() {
            if stored != model {
                return Err(SearchError::ModelMismatch {
                    store: stored.to_string(),
                    embedder: model.to_string(),
                });
            }
        }

        if let Some(chunk) = self
            .chunks
            .iter()
            .find(|chunk| chunk.embedding.len() != dimension)
        {
            return Err(SearchError::DimensionMismatch {
                expected: dimension,
                found: chunk.embedding.len(),
            });
        }

        Ok(())
    }
}
