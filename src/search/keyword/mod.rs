#[cfg(test)]
mod tests;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

use super::SearchError;

/// Default cap on keyword results
pub const DEFAULT_KEYWORD_LIMIT: usize = 10;

/// One page of the static keyword index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordDoc {
    pub id: u32,
    pub title: String,
    pub url: String,
    pub body: String,
}

pub trait KeywordSearcher: Send + Sync {
    /// Documents matching `query`, best field first, at most `limit` entries
    fn search(&self, query: &str, limit: usize) -> Vec<KeywordDoc>;
}

/// Inverted index over a single document field.
///
/// Tokens are kept sorted so every token sharing a prefix sits in one contiguous range.
#[derive(Debug, Default)]
struct FieldIndex {
    postings: BTreeMap<String, BTreeSet<usize>>,
}

impl FieldIndex {
    fn insert(&mut self, position: usize, text: &str) {
        for token in tokenize(text) {
            self.postings.entry(token).or_default().insert(position);
        }
    }

    /// Documents containing a token that starts with `prefix`
    fn prefix_matches(&self, prefix: &str) -> BTreeSet<usize> {
        self.postings
            .range(prefix.to_string()..)
            .take_while(|(token, _)| token.starts_with(prefix))
            .flat_map(|(_, positions)| positions.iter().copied())
            .collect()
    }

    /// Documents where every query token prefix-matches, in document order
    fn matches(&self, tokens: &[String]) -> Vec<usize> {
        let mut sets = tokens.iter().map(|token| self.prefix_matches(token));
        let Some(first) = sets.next() else {
            return Vec::new();
        };
        sets.fold(first, |acc, set| acc.intersection(&set).copied().collect())
            .into_iter()
            .collect()
    }
}

/// In-memory full-text index over document titles and bodies.
///
/// Built once from the static index file; searches are read-only.
#[derive(Debug, Default)]
pub struct KeywordIndex {
    docs: Vec<KeywordDoc>,
    title: FieldIndex,
    body: FieldIndex,
}

impl KeywordIndex {
    #[inline]
    pub fn build(docs: Vec<KeywordDoc>) -> Self {
        let mut title = FieldIndex::default();
        let mut body = FieldIndex::default();
        for (position, doc) in docs.iter().enumerate() {
            title.insert(position, &doc.title);
            body.insert(position, &doc.body);
        }
        debug!(
            "Built keyword index: {} docs, {} title tokens, {} body tokens",
            docs.len(),
            title.postings.len(),
            body.postings.len()
        );
        Self { docs, title, body }
    }

    /// Read the static index file (a JSON array of documents) and build the index
    #[inline]
    pub async fn load(path: &Path) -> Result<Self, SearchError> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            SearchError::IndexUnavailable(format!("{}: {}", path.display(), e))
        })?;
        let docs: Vec<KeywordDoc> = serde_json::from_str(&json).map_err(|e| {
            SearchError::IndexUnavailable(format!("{}: {}", path.display(), e))
        })?;
        info!("Loaded {} keyword documents from {}", docs.len(), path.display());
        Ok(Self::build(docs))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    #[inline]
    pub fn docs(&self) -> &[KeywordDoc] {
        &self.docs
    }
}

impl KeywordSearcher for KeywordIndex {
    /// Title matches come before body matches. A document id found in both fields
    /// appears once, at its first position.
    fn search(&self, query: &str, limit: usize) -> Vec<KeywordDoc> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Vec::new();
        }

        let title_hits = self.title.matches(&tokens);
        let body_hits = self.body.matches(&tokens);

        title_hits
            .into_iter()
            .chain(body_hits)
            .unique_by(|&position| self.docs[position].id)
            .take(limit)
            .map(|position| self.docs[position].clone())
            .collect()
    }
}

/// Lowercased alphanumeric runs
#[inline]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}
