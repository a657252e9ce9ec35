// Indexing module
// Offline builders for the static keyword index and the chunk embedding store

pub mod embedding_store;
pub mod keyword_index;
pub mod markdown;

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

pub use embedding_store::{collect_chunks, embedding_url, generate_embedding_store};
pub use keyword_index::{build_keyword_docs, file_to_url, write_keyword_index};
pub use markdown::{extract_title, strip_front_matter, strip_markdown, strip_mdx};

/// Every `.md` and `.mdx` file under `dir`, recursively, in sorted order
#[inline]
pub fn collect_doc_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    visit(dir, &mut files)?;
    files.sort();
    debug!("Found {} doc files under {}", files.len(), dir.display());
    Ok(files)
}

fn visit(dir: &Path, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read entry in {}", dir.display()))?
            .path();
        if path.is_dir() {
            visit(&path, files)?;
        } else if is_doc_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_doc_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "md" || ext == "mdx")
}

/// `path` relative to `base`, with forward slashes
pub(crate) fn relative_slash_path(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Directory that site-relative paths such as `docs/intro.md` are resolved against
pub(crate) fn site_root(docs_dir: &Path) -> &Path {
    docs_dir.parent().unwrap_or_else(|| Path::new(""))
}
