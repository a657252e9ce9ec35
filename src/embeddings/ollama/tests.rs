use super::*;
use crate::config::EmbedderConfig;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, dimension: u32) -> EmbedderConfig {
    EmbedderConfig {
        protocol: "http".to_string(),
        host: server.address().ip().to_string(),
        port: server.address().port(),
        model: "all-minilm:latest".to_string(),
        batch_size: 2,
        embedding_dimension: dimension,
    }
}

#[test]
fn client_configuration() {
    let config = EmbedderConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
        embedding_dimension: 768,
    };
    let client = OllamaEmbedder::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.dimension, 768);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
    assert_eq!(client.max_input_chars, DEFAULT_MAX_INPUT_CHARS);
}

#[test]
fn client_builder_methods() {
    let client = OllamaEmbedder::new(&EmbedderConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5)
        .with_max_input_chars(128);

    assert_eq!(client.retry_attempts, 5);
    assert_eq!(client.max_input_chars, 128);
    assert_eq!(client.model_id(), "all-minilm:latest");
    assert_eq!(client.dimension(), 384);
}

#[test]
fn untagged_model_matches_latest() {
    assert!(model_matches("all-minilm:latest", "all-minilm"));
    assert!(model_matches("all-minilm:latest", "all-minilm:latest"));
    assert!(!model_matches("all-minilm:l6-v2", "all-minilm"));
    assert!(!model_matches("nomic-embed-text:latest", "all-minilm"));
}

#[tokio::test]
async fn embed_normalizes_vectors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(serde_json::json!({
            "model": "all-minilm:latest",
            "input": ["hello"]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "embeddings": [[3.0, 4.0, 0.0]] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 3)).expect("client should build");
    let vector = embedder.embed("hello").await.expect("embed should succeed");

    assert_eq!(vector.len(), 3);
    assert!((vector[0] - 0.6).abs() < 1e-6);
    assert!((vector[1] - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn embed_batch_splits_by_batch_size() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embeddings": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "embeddings": [[0.0, 0.0, 2.0]] })),
        )
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 3)).expect("client should build");
    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = embedder
        .embed_batch(&texts)
        .await
        .expect("batch embed should succeed");

    assert_eq!(vectors.len(), 3);
    assert_eq!(vectors[2], vec![0.0, 0.0, 1.0]);
}

#[tokio::test]
async fn embed_rejects_wrong_dimension() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "embeddings": [[1.0, 0.0]] })),
        )
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 3)).expect("client should build");
    let err = embedder
        .embed("hello")
        .await
        .expect_err("dimension mismatch should fail");

    assert!(err.to_string().contains("expected 3"), "{}", err);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 3))
        .expect("client should build")
        .with_retry_attempts(3);
    let err = embedder.embed("hello").await.expect_err("404 should fail");

    assert!(err.to_string().contains("404"), "{}", err);
}

#[tokio::test]
async fn prepare_checks_model_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{ "name": "nomic-embed-text:latest" }]
        })))
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 3)).expect("client should build");
    let err = embedder
        .prepare()
        .await
        .expect_err("missing model should fail");

    assert!(err.to_string().contains("not available"), "{}", err);
}
