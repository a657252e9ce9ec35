use anyhow::Context;
use fancy_regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::markdown::{extract_title, strip_markdown};
use super::{collect_doc_files, relative_slash_path, site_root};
use crate::search::KeywordDoc;

static DOC_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(mdx?|md)$").expect("valid regex"));

/// Site URL for a doc file given relative to the site root: `docs/a/b.mdx` is `/docs/a/b`
#[inline]
pub fn file_to_url(relative_path: &str) -> String {
    let normalized = relative_path.replace('\\', "/");
    format!("/{}", DOC_EXTENSION.replace(&normalized, ""))
}

/// One keyword document per page under `docs_dir`, numbered in path order
#[inline]
pub fn build_keyword_docs(docs_dir: &Path) -> anyhow::Result<Vec<KeywordDoc>> {
    let root = site_root(docs_dir);
    let files = collect_doc_files(docs_dir)?;

    let mut docs = Vec::with_capacity(files.len());
    for (id, path) in files.iter().enumerate() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let doc = KeywordDoc {
            id: u32::try_from(id).context("Too many documents for the keyword index")?,
            title: extract_title(&content, path),
            url: file_to_url(&relative_slash_path(path, root)),
            body: strip_markdown(&content),
        };
        debug!("Indexed {} as \"{}\"", doc.url, doc.title);
        docs.push(doc);
    }

    Ok(docs)
}

/// Write the keyword index as pretty JSON, creating parent directories
#[inline]
pub fn write_keyword_index(docs: &[KeywordDoc], output: &Path) -> anyhow::Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(docs).context("Failed to serialize keyword index")?;
    std::fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Search index: {} docs -> {}", docs.len(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{KeywordIndex, KeywordSearcher};
    use tempfile::TempDir;

    #[test]
    fn url_drops_extension() {
        assert_eq!(file_to_url("docs/intro.md"), "/docs/intro");
        assert_eq!(
            file_to_url("docs/notebooks/04-live-code-demo.mdx"),
            "/docs/notebooks/04-live-code-demo"
        );
        assert_eq!(file_to_url("docs\\win\\page.md"), "/docs/win/page");
        assert_eq!(file_to_url("docs/guides/index.md"), "/docs/guides/index");
    }

    #[tokio::test]
    async fn builds_and_reloads_index() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let docs_dir = temp_dir.path().join("docs");
        std::fs::create_dir_all(docs_dir.join("guides")).expect("create dirs");
        std::fs::write(
            docs_dir.join("intro.md"),
            "---\ntitle: Introduction\n---\nWelcome to the **docs**.",
        )
        .expect("write intro");
        std::fs::write(
            docs_dir.join("guides/webhooks.mdx"),
            "import X from 'x';\n\n# Webhooks\n\nSend questions to the [webhook](/w).",
        )
        .expect("write guide");

        let docs = build_keyword_docs(&docs_dir).expect("build should succeed");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, 0);
        assert_eq!(docs[0].title, "Webhooks");
        assert_eq!(docs[0].url, "/docs/guides/webhooks");
        assert_eq!(docs[0].body, "Webhooks\nSend questions to the webhook.");
        assert_eq!(docs[1].title, "Introduction");
        assert_eq!(docs[1].url, "/docs/intro");
        assert_eq!(docs[1].body, "Welcome to the docs.");

        let output = temp_dir.path().join("static/search-index.json");
        write_keyword_index(&docs, &output).expect("write should succeed");

        let index = KeywordIndex::load(&output).await.expect("index should load");
        assert_eq!(index.len(), 2);
        let hits = index.search("webhook", 10);
        assert_eq!(hits[0].url, "/docs/guides/webhooks");
    }
}
