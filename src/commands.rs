use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::{ChatSession, WebhookClient};
use crate::config::Config;
use crate::embeddings::{ChunkingConfig, EmbeddingStore, OllamaEmbedder};
use crate::indexing::{
    build_keyword_docs, collect_chunks, generate_embedding_store, write_keyword_index,
};
use crate::pipeline::{
    HttpPipelineApi, PipelineController, PipelineStatus, PollPolicy, result_documents,
};
use crate::search::{
    KeywordIndex, KeywordSearcher, ScoredChunk, SearchError, SearchEvent, SearchMode,
    SearchOrchestrator, SearchSession, SearchView, SemanticRanker,
};

/// Build the static keyword index from the docs tree
#[inline]
pub fn build_index(docs_dir: &Path, output: &Path) -> Result<usize> {
    info!("Building keyword index from {}", docs_dir.display());
    let docs = build_keyword_docs(docs_dir)?;
    write_keyword_index(&docs, output)?;
    println!("Indexed {} pages into {}", docs.len(), output.display());
    Ok(docs.len())
}

/// Chunk the docs tree, embed every chunk with the configured model and save the store
#[inline]
pub async fn embed_docs(config: &Config, docs_dir: &Path, output: &Path) -> Result<usize> {
    let chunking = ChunkingConfig::default();
    let chunks = collect_chunks(docs_dir, &chunking)?;
    if chunks.is_empty() {
        warn!("No chunks found under {}", docs_dir.display());
    }

    let embedder = OllamaEmbedder::new(&config.embedder)?
        .with_max_input_chars(chunking.max_input_chars);
    let store = generate_embedding_store(&chunks, &embedder, &chunking).await?;
    store
        .save(output)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Embedded {} chunks with {} into {}",
        store.len(),
        config.embedder.model,
        output.display()
    );
    Ok(store.len())
}

fn semantic_ranker(config: &Config) -> Result<SemanticRanker> {
    let embedder = OllamaEmbedder::new(&config.embedder)?;
    Ok(SemanticRanker::from_path(
        Arc::new(embedder),
        config.paths.embeddings_file.clone(),
    ))
}

/// Run a single query and print the results
#[inline]
pub async fn search_once(
    config: &Config,
    query: &str,
    mode: SearchMode,
    top_k: Option<usize>,
) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        return Err(SearchError::EmptyQuery.into());
    }

    match mode {
        SearchMode::Keyword => {
            let index = KeywordIndex::load(&config.paths.keyword_index_file).await?;
            let limit = top_k.unwrap_or(config.search.keyword_limit);
            let docs = index.search(query, limit);
            if docs.is_empty() {
                println!("No results found.");
            }
            for doc in docs {
                println!("{}  {}", doc.title, doc.url);
            }
        }
        SearchMode::Semantic => {
            let ranker = semantic_ranker(config)?;
            let results = ranker
                .rank(query, top_k.unwrap_or(config.search.top_k))
                .await?;
            print_semantic(&results);
        }
    }

    Ok(())
}

fn print_semantic(results: &[ScoredChunk]) {
    if results.is_empty() {
        println!("No results found.");
    }
    for result in results {
        println!(
            "{:.3}  {}  {}",
            result.score, result.chunk.title, result.chunk.url
        );
    }
}

fn render_view(view: &SearchView) {
    if let Some(error) = &view.semantic_error {
        println!("! {}", error);
        return;
    }
    match view.mode {
        SearchMode::Keyword => {
            for doc in &view.keyword_results {
                println!("  {}  {}", doc.title, doc.url);
            }
        }
        SearchMode::Semantic => {
            for result in &view.semantic_results {
                println!(
                    "  {:.3}  {}  {}",
                    result.score, result.chunk.title, result.chunk.url
                );
            }
        }
    }
}

/// Drive a search session from stdin.
///
/// Each line is a query. `/keyword` and `/semantic` switch modes, `/cancel` aborts a
/// running semantic search, `/clear` resets the box and `/quit` (or EOF) exits.
#[inline]
pub async fn interactive_search(config: &Config, mode: SearchMode) -> Result<()> {
    let index = KeywordIndex::load(&config.paths.keyword_index_file).await?;
    info!("Loaded keyword index with {} pages", index.len());

    let orchestrator = SearchOrchestrator::new(Arc::new(index), &config.search);
    let session = SearchSession::new(orchestrator, Arc::new(semantic_ranker(config)?));

    let (events, events_rx) = mpsc::channel(32);
    let (view_tx, mut view_rx) = watch::channel(SearchView::default());
    let session = tokio::spawn(session.run(events_rx, view_tx));

    let printer = tokio::spawn(async move {
        let mut last_printed: Option<SearchView> = None;
        while view_rx.changed().await.is_ok() {
            let view = view_rx.borrow_and_update().clone();
            let settled = !view.keyword_loading && !view.semantic_loading;
            if settled && view.open && last_printed.as_ref() != Some(&view) {
                render_view(&view);
                last_printed = Some(view);
            }
        }
    });

    println!("Search mode: {}. Type a query, or /keyword, /semantic, /clear, /quit", mode);
    if mode == SearchMode::Semantic {
        events.send(SearchEvent::SwitchMode(mode)).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let batch = match line {
            "/quit" => break,
            "/keyword" => vec![SearchEvent::SwitchMode(SearchMode::Keyword)],
            "/semantic" => vec![SearchEvent::SwitchMode(SearchMode::Semantic)],
            "/cancel" => vec![SearchEvent::CancelSemantic],
            "/clear" => vec![SearchEvent::Clear],
            query => vec![
                SearchEvent::Focus,
                SearchEvent::Input(query.to_string()),
                SearchEvent::Submit,
            ],
        };
        for event in batch {
            events.send(event).await?;
        }
    }

    drop(events);
    let final_view = session.await.context("Search session task failed")?;
    printer.await.context("Search output task failed")?;
    debug!("Search session ended with query {:?}", final_view.query);
    Ok(())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            token.cancel();
        }
    });
    cancel
}

/// Ask the chat webhook a single question
#[inline]
pub async fn ask(config: &Config, question: &str) -> Result<()> {
    let client = WebhookClient::new(&config.chat)?;
    let mut session = ChatSession::new(Arc::new(client));
    let cancel = cancel_on_ctrl_c();

    match session.send(question, &cancel).await? {
        Some(answer) => println!("{}", answer),
        None => println!("Nothing to ask."),
    }
    Ok(())
}

/// Execute a pipeline definition file and report its documents.
///
/// Ctrl-C cancels the run. Results go to `output` as pretty JSON when given.
#[inline]
pub async fn run_pipeline(
    config: &Config,
    pipeline_file: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(pipeline_file)
        .await
        .with_context(|| format!("Failed to read {}", pipeline_file.display()))?;
    let definition: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid JSON in {}", pipeline_file.display()))?;

    let api = HttpPipelineApi::new(&config.pipeline)?;
    let controller =
        PipelineController::new(Arc::new(api), PollPolicy::from_config(&config.pipeline));
    let cancel = cancel_on_ctrl_c();

    let spinner = if console::user_attended_stderr() {
        let spinner = ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .expect("style template is valid"),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    } else {
        ProgressBar::hidden()
    };

    let mut progress = controller.subscribe();
    let progress_bar = spinner.clone();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot = progress.borrow_and_update().clone();
            if snapshot.status == PipelineStatus::Polling && snapshot.attempt > 0 {
                progress_bar.set_message(format!("polling (attempt {})", snapshot.attempt));
            } else {
                progress_bar.set_message(snapshot.status.to_string());
            }
        }
    });

    let outcome = controller.execute(&definition, &cancel).await;
    spinner.finish_and_clear();
    reporter.abort();

    let results = match outcome {
        Ok(results) => results,
        Err(crate::pipeline::PipelineError::Cancelled) => {
            println!("Pipeline execution cancelled.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "Pipeline finished with {} documents",
        result_documents(&results).len()
    );

    if let Some(output) = output {
        let json = serde_json::to_string_pretty(&results)?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, json)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Results written to {}", output.display());
    }

    Ok(())
}

/// Load the embedding store and report what it contains
#[inline]
pub async fn show_store_info(path: &Path) -> Result<()> {
    let store = EmbeddingStore::load(path).await?;
    println!("Embedding store: {}", path.display());
    println!("  Model: {}", store.model.as_deref().unwrap_or("unknown"));
    println!("  Chunks: {}", store.len());
    if let Some(dimension) = store.dimension() {
        println!("  Dimension: {}", dimension);
    }
    if let Some(generated_at) = store.generated_at {
        println!("  Generated: {}", generated_at.to_rfc3339());
    }
    Ok(())
}
