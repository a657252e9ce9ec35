
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Debouncer, KeywordDoc, KeywordSearcher, ScoredChunk, SearchError};
use crate::config::SearchConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Keyword,
    Semantic,
}

impl fmt::Display for SearchMode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword => write!(f, "keyword"),
            Self::Semantic => write!(f, "semantic"),
        }
    }
}

/// Everything a renderer needs to draw the search box and its results surface
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchView {
    pub query: String,
    pub mode: SearchMode,
    pub open: bool,
    pub focused: bool,
    pub keyword_results: Vec<KeywordDoc>,
    pub keyword_loading: bool,
    pub semantic_results: Vec<ScoredChunk>,
    pub semantic_loading: bool,
    pub semantic_error: Option<String>,
}

/// A semantic search the driver should start.
///
/// The result must be handed back through [`SearchOrchestrator::complete_semantic`]
/// with the same generation; it is dropped if the request was superseded or cancelled.
#[derive(Debug, Clone)]
pub struct SemanticRequest {
    pub generation: u64,
    pub query: String,
    pub top_k: usize,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    cancel: CancellationToken,
}

/// State machine behind the search box.
///
/// It performs no IO of its own: keyword lookups are synchronous and in memory,
/// semantic searches are returned as [`SemanticRequest`]s for the caller to run, and
/// time is passed in so the debounce can be driven by any clock.
pub struct SearchOrchestrator {
    keyword: Arc<dyn KeywordSearcher>,
    keyword_limit: usize,
    top_k: usize,
    debounce: Debouncer<String>,
    view: SearchView,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl SearchOrchestrator {
    #[inline]
    pub fn new(keyword: Arc<dyn KeywordSearcher>, config: &SearchConfig) -> Self {
        Self {
            keyword,
            keyword_limit: config.keyword_limit,
            top_k: config.top_k,
            debounce: Debouncer::new(config.debounce()),
            view: SearchView::default(),
            generation: 0,
            in_flight: None,
        }
    }

    #[inline]
    pub fn view(&self) -> &SearchView {
        &self.view
    }

    #[inline]
    pub fn mode(&self) -> SearchMode {
        self.view.mode
    }

    /// When the pending keyword search becomes due, if one is scheduled
    #[inline]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// The input box changed
    #[inline]
    pub fn input(&mut self, text: &str, now: Instant) {
        self.view.query = text.to_string();
        self.view.open = true;

        if self.view.mode != SearchMode::Keyword {
            return;
        }

        if text.trim().is_empty() {
            self.debounce.cancel();
            self.view.keyword_results.clear();
            self.view.keyword_loading = false;
        } else {
            self.debounce.push(text.to_string(), now);
            self.view.keyword_loading = true;
        }
    }

    /// Run the debounced keyword search if its window has elapsed.
    ///
    /// Returns true when a search ran.
    #[inline]
    pub fn poll_debounce(&mut self, now: Instant) -> bool {
        match self.debounce.take_due(now) {
            Some(query) => {
                self.run_keyword(&query);
                true
            }
            None => false,
        }
    }

    fn run_keyword(&mut self, query: &str) {
        self.view.keyword_loading = false;
        if query.trim().is_empty() {
            self.view.keyword_results.clear();
            return;
        }
        self.view.keyword_results = self.keyword.search(query, self.keyword_limit);
        debug!(
            "Keyword search for '{}' returned {} results",
            query,
            self.view.keyword_results.len()
        );
    }

    /// Enter was pressed. In semantic mode this supersedes any in-flight request.
    #[inline]
    pub fn submit(&mut self) -> Option<SemanticRequest> {
        let query = self.view.query.trim();
        if self.view.mode != SearchMode::Semantic || query.is_empty() {
            return None;
        }
        let query = query.to_string();

        self.cancel_in_flight();
        self.generation += 1;
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            generation: self.generation,
            cancel: cancel.clone(),
        });

        self.view.semantic_loading = true;
        self.view.semantic_error = None;
        self.view.open = true;

        debug!("Starting semantic search #{} for '{}'", self.generation, query);
        Some(SemanticRequest {
            generation: self.generation,
            query,
            top_k: self.top_k,
            cancel,
        })
    }

    /// Apply the outcome of a semantic request.
    ///
    /// Returns false, leaving the state untouched, when the request is no longer the
    /// current one or was cancelled.
    #[inline]
    pub fn complete_semantic(
        &mut self,
        generation: u64,
        result: Result<Vec<ScoredChunk>, SearchError>,
    ) -> bool {
        let is_current = self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation && !f.cancel.is_cancelled());
        if !is_current {
            debug!("Ignoring result of superseded semantic search #{}", generation);
            return false;
        }

        self.in_flight = None;
        self.view.semantic_loading = false;
        match result {
            Ok(results) => {
                self.view.semantic_results = results;
                self.view.semantic_error = None;
            }
            Err(error) => {
                self.view.semantic_results.clear();
                self.view.semantic_error = Some(error.to_string());
            }
        }
        true
    }

    #[inline]
    pub fn cancel_semantic(&mut self) {
        self.cancel_in_flight();
        self.view.semantic_loading = false;
    }

    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!("Cancelling semantic search #{}", in_flight.generation);
            in_flight.cancel.cancel();
        }
    }

    /// Switch modes. Results and errors of both modes are dropped; a keyword query
    /// already in the box is searched again straight away.
    #[inline]
    pub fn switch_mode(&mut self, mode: SearchMode) {
        self.view.mode = mode;
        self.clear_keyword();
        self.cancel_semantic();
        self.clear_semantic();
        self.view.open = false;

        if mode == SearchMode::Keyword && !self.view.query.trim().is_empty() {
            let query = self.view.query.clone();
            self.run_keyword(&query);
            self.view.open = true;
        }
    }

    /// Global shortcut: focus the box and open the surface
    #[inline]
    pub fn shortcut(&mut self) {
        self.view.focused = true;
        self.view.open = true;
    }

    /// Focus returned to the box; reopen only if there is something to show
    #[inline]
    pub fn focus(&mut self) {
        self.view.focused = true;
        if self.has_content() {
            self.view.open = true;
        }
    }

    #[inline]
    pub fn click_outside(&mut self) {
        self.view.open = false;
    }

    #[inline]
    pub fn escape(&mut self) {
        self.view.open = false;
        self.view.focused = false;
    }

    /// A result was chosen: close and reset both modes
    #[inline]
    pub fn select_result(&mut self) {
        self.view.open = false;
        self.view.query.clear();
        self.clear_keyword();
        self.cancel_semantic();
        self.clear_semantic();
    }

    /// Explicit clear. Unlike `click_outside`, this drops query and results.
    #[inline]
    pub fn clear(&mut self) {
        self.select_result();
    }

    /// Whether the surface has anything worth opening for
    #[inline]
    pub fn has_content(&self) -> bool {
        match self.view.mode {
            SearchMode::Keyword => {
                let query = self.view.query.trim();
                !query.is_empty()
                    && (!self.view.keyword_results.is_empty()
                        || self.view.keyword_loading
                        || query.chars().count() >= 2)
            }
            SearchMode::Semantic => {
                !self.view.semantic_results.is_empty()
                    || self.view.semantic_loading
                    || self.view.semantic_error.is_some()
            }
        }
    }

    fn clear_keyword(&mut self) {
        self.debounce.cancel();
        self.view.keyword_results.clear();
        self.view.keyword_loading = false;
    }

    fn clear_semantic(&mut self) {
        self.view.semantic_results.clear();
        self.view.semantic_error = None;
    }
}
