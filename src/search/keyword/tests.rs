use super::*;
use tempfile::TempDir;

fn doc(id: u32, title: &str, body: &str) -> KeywordDoc {
    KeywordDoc {
        id,
        title: title.to_string(),
        url: format!("/docs/page-{}", id),
        body: body.to_string(),
    }
}

fn sample_index() -> KeywordIndex {
    KeywordIndex::build(vec![
        doc(1, "Getting Started", "Install the CLI and create your first pipeline."),
        doc(2, "Pipeline Components", "Every pipeline is a graph of components."),
        doc(3, "Webhooks", "Send a question to the chat webhook."),
        doc(4, "Troubleshooting", "Authentication errors usually mean a bad API key."),
    ])
}

fn ids(results: &[KeywordDoc]) -> Vec<u32> {
    results.iter().map(|d| d.id).collect()
}

#[test]
fn tokenize_lowercases_and_splits() {
    assert_eq!(
        tokenize("Hello, World! v2.0 API_key"),
        vec!["hello", "world", "v2", "0", "api", "key"]
    );
    assert!(tokenize("  \t ").is_empty());
    assert!(tokenize("--- ***").is_empty());
}

#[test]
fn empty_query_returns_nothing() {
    let index = sample_index();
    assert!(index.search("", DEFAULT_KEYWORD_LIMIT).is_empty());
    assert!(index.search("   ", DEFAULT_KEYWORD_LIMIT).is_empty());
    assert!(index.search("?!", DEFAULT_KEYWORD_LIMIT).is_empty());
}

#[test]
fn prefix_matching() {
    let index = sample_index();
    assert_eq!(ids(&index.search("webh", DEFAULT_KEYWORD_LIMIT)), vec![3]);
    assert_eq!(ids(&index.search("TROUBLE", DEFAULT_KEYWORD_LIMIT)), vec![4]);
}

#[test]
fn title_hits_come_before_body_hits() {
    let index = sample_index();
    // "pipeline" is in the title of 2 and the bodies of 1 and 2
    assert_eq!(ids(&index.search("pipeline", DEFAULT_KEYWORD_LIMIT)), vec![2, 1]);
}

#[test]
fn document_matching_both_fields_appears_once() {
    let index = KeywordIndex::build(vec![doc(7, "Webhook setup", "Configure the webhook token.")]);
    let results = index.search("webhook", DEFAULT_KEYWORD_LIMIT);
    assert_eq!(ids(&results), vec![7]);
}

#[test]
fn all_query_tokens_must_match_a_field() {
    let index = sample_index();
    assert_eq!(ids(&index.search("bad api", DEFAULT_KEYWORD_LIMIT)), vec![4]);
    assert!(index.search("webhook authentication", DEFAULT_KEYWORD_LIMIT).is_empty());
}

#[test]
fn no_match_is_empty() {
    let index = sample_index();
    assert!(index.search("kubernetes", DEFAULT_KEYWORD_LIMIT).is_empty());
}

#[test]
fn results_are_truncated_to_limit() {
    let docs = (0..25)
        .map(|i| doc(i, &format!("Guide {}", i), "common words here"))
        .collect();
    let index = KeywordIndex::build(docs);

    let results = index.search("common", DEFAULT_KEYWORD_LIMIT);
    assert_eq!(results.len(), DEFAULT_KEYWORD_LIMIT);
    assert_eq!(ids(&results), (0..10).collect::<Vec<u32>>());

    assert_eq!(index.search("guide", 3).len(), 3);
}

#[test]
fn empty_index() {
    let index = KeywordIndex::build(Vec::new());
    assert!(index.is_empty());
    assert!(index.search("anything", DEFAULT_KEYWORD_LIMIT).is_empty());
}

#[tokio::test]
async fn load_from_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("search-index.json");
    let docs = vec![doc(1, "Intro", "Welcome"), doc(2, "Setup", "Install steps")];
    std::fs::write(&path, serde_json::to_string(&docs).expect("serialize docs"))
        .expect("Failed to write index");

    let index = KeywordIndex::load(&path).await.expect("index should load");
    assert_eq!(index.len(), 2);
    assert_eq!(index.docs()[1].title, "Setup");
    assert_eq!(ids(&index.search("install", DEFAULT_KEYWORD_LIMIT)), vec![2]);
}

#[tokio::test]
async fn load_missing_file_is_unavailable() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let err = KeywordIndex::load(&temp_dir.path().join("missing.json"))
        .await
        .expect_err("missing file should fail");
    assert!(matches!(err, SearchError::IndexUnavailable(_)));
}

#[tokio::test]
async fn load_malformed_file_is_unavailable() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("search-index.json");
    std::fs::write(&path, "{\"not\": \"an array\"}").expect("Failed to write index");

    let err = KeywordIndex::load(&path).await.expect_err("bad json should fail");
    assert!(matches!(err, SearchError::IndexUnavailable(_)));
}
