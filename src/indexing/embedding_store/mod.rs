
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{debug, info};

use super::markdown::{strip_front_matter, strip_mdx};
use super::{collect_doc_files, relative_slash_path, site_root};
use crate::embeddings::{
    Chunk, ChunkingConfig, DocChunk, Embedder, EmbeddingStore, chunk_document,
};

/// Number of chunk texts sent to the embedder per request
const EMBED_BATCH_SIZE: usize = 16;

/// Page URL for a path relative to the docs directory: `guides/index.mdx` is `/docs/guides`
#[inline]
pub fn embedding_url(docs_relative_path: &str) -> String {
    let path = docs_relative_path.replace('\\', "/");
    let path = path
        .strip_suffix(".mdx")
        .or_else(|| path.strip_suffix(".md"))
        .unwrap_or(&path);
    let path = path.strip_suffix("/index").unwrap_or(path);
    format!("/docs/{}", path)
}

/// Split every page under `docs_dir` into heading sections
#[inline]
pub fn collect_chunks(docs_dir: &Path, config: &ChunkingConfig) -> anyhow::Result<Vec<DocChunk>> {
    let root = site_root(docs_dir);
    let files = collect_doc_files(docs_dir)?;

    let mut chunks = Vec::new();
    for path in &files {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let cleaned = strip_mdx(strip_front_matter(&raw));

        let source = relative_slash_path(path, root);
        let url = embedding_url(&relative_slash_path(path, docs_dir));
        let fallback_title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        chunks.extend(chunk_document(&cleaned, &source, &url, &fallback_title, config));
    }

    info!("Created {} chunks from {} doc files", chunks.len(), files.len());
    Ok(chunks)
}

/// Embed each chunk's title and text and assemble a store tagged with the embedder's model.
///
/// Chunk ids are `<source>#<n>` where `n` counts chunks across the whole run.
#[inline]
pub async fn generate_embedding_store(
    chunks: &[DocChunk],
    embedder: &dyn Embedder,
    config: &ChunkingConfig,
) -> crate::Result<EmbeddingStore> {
    embedder.prepare().await?;

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(chunks.len() as u64).with_style(
            ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let mut embedded = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(EMBED_BATCH_SIZE) {
        let inputs: Vec<String> = batch
            .iter()
            .map(|chunk| chunk.embedding_input(config.max_input_chars))
            .collect();
        if let Some(first) = batch.first() {
            bar.set_message(first.source.clone());
        }

        let vectors = embedder.embed_batch(&inputs).await?;
        if vectors.len() != batch.len() {
            return Err(crate::DocsError::Embedding(format!(
                "Embedder returned {} vectors for {} inputs",
                vectors.len(),
                batch.len()
            )));
        }

        for (chunk, embedding) in batch.iter().zip(vectors) {
            let n = embedded.len();
            embedded.push(Chunk {
                id: format!("{}#{}", chunk.source, n),
                title: chunk.title.clone(),
                text: chunk.text.clone(),
                source: chunk.source.clone(),
                url: chunk.url.clone(),
                embedding,
            });
        }
        bar.inc(batch.len() as u64);
        debug!("Embedded {}/{} chunks", embedded.len(), chunks.len());
    }
    bar.finish_and_clear();

    info!(
        "Generated {} embeddings with model {}",
        embedded.len(),
        embedder.model_id()
    );
    Ok(EmbeddingStore::new(embedder.model_id(), embedded))
}
