#[cfg(test)]
mod tests;

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A section of a documentation page ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocChunk {
    /// Text of the heading that opened this section, or the file stem
    pub title: String,
    /// Section body without the heading line
    pub text: String,
    /// Source path relative to the site root
    pub source: String,
    /// Site URL of the page the section belongs to
    pub url: String,
}

impl DocChunk {
    /// Text handed to the embedder: title and body, bounded by `max_chars`
    #[inline]
    pub fn embedding_input(&self, max_chars: usize) -> String {
        let input = format!("{}\n{}", self.title, self.text);
        crate::embeddings::truncate_chars(&input, max_chars).to_string()
    }
}

/// Configuration for heading-based chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Deepest heading level that starts a new chunk
    pub max_heading_level: u8,
    /// Sections whose trimmed body is this many characters or fewer are dropped
    pub min_chunk_chars: usize,
    /// Character budget for embedder input
    pub max_input_chars: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_heading_level: 3,
            min_chunk_chars: 20,
            max_input_chars: crate::embeddings::DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

struct HeadingSpan {
    start: usize,
    end: usize,
    title: String,
}

/// Split a cleaned markdown document into sections at headings up to
/// `max_heading_level`. Content before the first heading is titled `fallback_title`.
#[inline]
pub fn chunk_document(
    markdown: &str,
    source: &str,
    url: &str,
    fallback_title: &str,
    config: &ChunkingConfig,
) -> Vec<DocChunk> {
    let headings = find_headings(markdown, config.max_heading_level);

    let mut chunks = Vec::new();
    let mut title = fallback_title.to_string();
    let mut body_start = 0;

    for heading in headings {
        push_chunk(
            &mut chunks,
            markdown.get(body_start..heading.start).unwrap_or_default(),
            &title,
            source,
            url,
            config,
        );
        title = heading.title;
        body_start = heading.end;
    }
    push_chunk(
        &mut chunks,
        markdown.get(body_start..).unwrap_or_default(),
        &title,
        source,
        url,
        config,
    );

    debug!("Chunked {} into {} sections", source, chunks.len());
    chunks
}

fn push_chunk(
    chunks: &mut Vec<DocChunk>,
    body: &str,
    title: &str,
    source: &str,
    url: &str,
    config: &ChunkingConfig,
) {
    let text = body.trim();
    if text.chars().count() <= config.min_chunk_chars {
        return;
    }
    chunks.push(DocChunk {
        title: title.to_string(),
        text: text.to_string(),
        source: source.to_string(),
        url: url.to_string(),
    });
}

fn find_headings(markdown: &str, max_level: u8) -> Vec<HeadingSpan> {
    let mut spans = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (event, range) in Parser::new(markdown).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) if heading_depth(level) <= max_level => {
                current = Some((range.start, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, title)) = current.as_mut() {
                    title.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((start, title)) = current.take() {
                    spans.push(HeadingSpan {
                        start,
                        end: range.end,
                        title: clean_heading(&title),
                    });
                }
            }
            _ => {}
        }
    }

    spans
}

fn heading_depth(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn clean_heading(title: &str) -> String {
    title
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '`'))
        .collect::<String>()
        .trim()
        .to_string()
}
