use super::*;

const PAGE: &str = "\
Intro paragraph that appears before any heading at all.

# Getting Started

Install the package and configure your API key before running anything.

## Short

tiny

### Pipelines

Pipelines are built from **components** connected in order.

#### Details

Deeper headings stay inside the parent section.
";

fn chunks() -> Vec<DocChunk> {
    chunk_document(
        PAGE,
        "docs/intro.md",
        "/docs/intro",
        "intro",
        &ChunkingConfig::default(),
    )
}

#[test]
fn content_before_first_heading_uses_fallback_title() {
    let chunks = chunks();
    assert_eq!(chunks[0].title, "intro");
    assert!(chunks[0].text.starts_with("Intro paragraph"));
}

#[test]
fn splits_on_headings_up_to_level_three() {
    let titles: Vec<String> = chunks().into_iter().map(|c| c.title).collect();
    assert_eq!(titles, vec!["intro", "Getting Started", "Pipelines"]);
}

#[test]
fn short_sections_are_dropped() {
    assert!(chunks().iter().all(|c| c.title != "Short"));
}

#[test]
fn deeper_headings_stay_in_parent_section() {
    let pipelines = chunks()
        .into_iter()
        .find(|c| c.title == "Pipelines")
        .expect("pipelines section should exist");
    assert!(pipelines.text.contains("#### Details"));
    assert!(pipelines.text.contains("Deeper headings"));
}

#[test]
fn chunk_metadata_is_copied() {
    for chunk in chunks() {
        assert_eq!(chunk.source, "docs/intro.md");
        assert_eq!(chunk.url, "/docs/intro");
    }
}

#[test]
fn heading_markup_is_removed_from_titles() {
    let doc = "## The `run_pipeline` *helper*\n\nThis section explains the helper in detail.\n";
    let chunks = chunk_document(doc, "a.md", "/docs/a", "a", &ChunkingConfig::default());
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].title, "The runpipeline helper");
}

#[test]
fn min_length_boundary() {
    let config = ChunkingConfig::default();
    let exactly_twenty = "# A\n\n12345678901234567890\n";
    let twenty_one = "# A\n\n123456789012345678901\n";

    assert!(chunk_document(exactly_twenty, "a.md", "/a", "a", &config).is_empty());
    assert_eq!(chunk_document(twenty_one, "a.md", "/a", "a", &config).len(), 1);
}

#[test]
fn embedding_input_is_truncated() {
    let chunk = DocChunk {
        title: "Title".to_string(),
        text: "x".repeat(1000),
        source: "a.md".to_string(),
        url: "/a".to_string(),
    };
    let input = chunk.embedding_input(512);
    assert_eq!(input.chars().count(), 512);
    assert!(input.starts_with("Title\nxxx"));
}

#[test]
fn empty_document_has_no_chunks() {
    assert!(chunk_document("", "a.md", "/a", "a", &ChunkingConfig::default()).is_empty());
}
