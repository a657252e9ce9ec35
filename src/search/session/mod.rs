
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info};

use super::{
    ScoredChunk, SearchError, SearchMode, SearchOrchestrator, SearchView, SemanticRequest,
    SemanticSearcher,
};

/// User interactions with the search box
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    Input(String),
    /// Enter key
    Submit,
    SwitchMode(SearchMode),
    /// Ctrl/Cmd+K
    Shortcut,
    Focus,
    ClickOutside,
    Escape,
    SelectResult,
    Clear,
    CancelSemantic,
}

type Completion = (u64, Result<Vec<ScoredChunk>, SearchError>);

/// Async driver for a [`SearchOrchestrator`].
///
/// Owns the orchestrator for the lifetime of one search box: events come in on an
/// mpsc channel, debounce deadlines are slept on, semantic requests run as spawned
/// tasks, and every state change is published on a watch channel.
pub struct SearchSession {
    orchestrator: SearchOrchestrator,
    semantic: Arc<dyn SemanticSearcher>,
}

impl SearchSession {
    #[inline]
    pub fn new(orchestrator: SearchOrchestrator, semantic: Arc<dyn SemanticSearcher>) -> Self {
        Self {
            orchestrator,
            semantic,
        }
    }

    /// Process events until the sender side is dropped, then cancel any in-flight
    /// semantic search and return the final view.
    #[inline]
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<SearchEvent>,
        view: watch::Sender<SearchView>,
    ) -> SearchView {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        info!("Search session started in {} mode", self.orchestrator.mode());

        loop {
            let deadline = self.orchestrator.next_deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event, &done_tx),
                    None => break,
                },
                () = sleep_until(deadline) => {
                    self.orchestrator.poll_debounce(Instant::now());
                }
                Some((generation, result)) = done_rx.recv() => {
                    self.orchestrator.complete_semantic(generation, result);
                }
            }
            publish(&view, self.orchestrator.view());
        }

        self.orchestrator.cancel_semantic();
        publish(&view, self.orchestrator.view());
        debug!("Search session closed");
        self.orchestrator.view().clone()
    }

    fn handle(&mut self, event: SearchEvent, done: &mpsc::UnboundedSender<Completion>) {
        debug!("Search event: {:?}", event);
        match event {
            SearchEvent::Input(text) => self.orchestrator.input(&text, Instant::now()),
            SearchEvent::Submit => {
                if let Some(request) = self.orchestrator.submit() {
                    self.spawn_semantic(request, done.clone());
                }
            }
            SearchEvent::SwitchMode(mode) => self.orchestrator.switch_mode(mode),
            SearchEvent::Shortcut => self.orchestrator.shortcut(),
            SearchEvent::Focus => self.orchestrator.focus(),
            SearchEvent::ClickOutside => self.orchestrator.click_outside(),
            SearchEvent::Escape => self.orchestrator.escape(),
            SearchEvent::SelectResult => self.orchestrator.select_result(),
            SearchEvent::Clear => self.orchestrator.clear(),
            SearchEvent::CancelSemantic => self.orchestrator.cancel_semantic(),
        }
    }

    fn spawn_semantic(&self, request: SemanticRequest, done: mpsc::UnboundedSender<Completion>) {
        let searcher = Arc::clone(&self.semantic);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = request.cancel.cancelled() => {
                    debug!("Semantic search #{} aborted", request.generation);
                }
                result = searcher.search(&request.query, request.top_k) => {
                    if done.send((request.generation, result)).is_err() {
                        debug!(
                            "Search session ended before semantic search #{} finished",
                            request.generation
                        );
                    }
                }
            }
        });
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn publish(view: &watch::Sender<SearchView>, current: &SearchView) {
    view.send_if_modified(|published| {
        if published == current {
            false
        } else {
            *published = current.clone();
            true
        }
    });
}
