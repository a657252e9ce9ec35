// Search module
// Semantic ranking over precomputed embeddings, keyword lookup over the static index,
// and the orchestrator that arbitrates between the two for a single search box

pub mod debounce;
pub mod keyword;
pub mod lazy;
pub mod orchestrator;
pub mod semantic;
pub mod session;

use thiserror::Error;

pub use debounce::Debouncer;
pub use keyword::{KeywordDoc, KeywordIndex, KeywordSearcher};
pub use lazy::LazyLoad;
pub use orchestrator::{SearchMode, SearchOrchestrator, SearchView, SemanticRequest};
pub use semantic::{ScoredChunk, SemanticRanker, SemanticSearcher, rank_vector};
pub use session::{SearchEvent, SearchSession};

/// Errors surfaced inline by the search box. None of them are fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Embeddings unavailable: {0}")]
    EmbeddingsUnavailable(String),

    #[error("Embedding store was built with model '{store}' but the embedder uses '{embedder}'")]
    ModelMismatch { store: String, embedder: String },

    #[error("Embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Keyword index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Query is empty")]
    EmptyQuery,
}
