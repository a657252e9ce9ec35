use super::*;
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ChatConfig {
    ChatConfig {
        webhook_url: format!("{}/webhook", server.uri()),
        webhook_token: Some("tok123".to_string()),
        authorization: Some("pk_test".to_string()),
    }
}

#[test]
fn extract_answer_joins_answers() {
    let response = json!({
        "status": "OK",
        "data": { "objects": { "body": { "answers": ["first", "second"] } } }
    });
    assert_eq!(extract_answer(&response), "first\nsecond");
}

#[test]
fn extract_answer_non_ok_status() {
    assert_eq!(extract_answer(&json!({ "status": "Error" })), "Error: Error");
    assert_eq!(extract_answer(&json!({})), "Error: Unknown error");
    assert_eq!(extract_answer(&json!({ "status": "" })), "Error: Unknown error");
}

#[test]
fn extract_answer_missing_answers() {
    assert_eq!(extract_answer(&json!({ "status": "OK" })), NO_RESPONSE);
    assert_eq!(
        extract_answer(&json!({ "status": "OK", "data": { "objects": { "body": {} } } })),
        NO_RESPONSE
    );
    assert_eq!(
        extract_answer(&json!({
            "status": "OK",
            "data": { "objects": { "body": { "answers": [] } } }
        })),
        NO_RESPONSE
    );
}

#[test]
fn client_requires_authorization() {
    let config = ChatConfig {
        authorization: None,
        ..ChatConfig::default()
    };
    assert!(matches!(
        WebhookClient::new(&config),
        Err(ChatError::NotConfigured(_))
    ));

    let config = ChatConfig {
        authorization: Some("   ".to_string()),
        ..ChatConfig::default()
    };
    assert!(WebhookClient::new(&config).is_err());
}

#[test]
fn token_is_appended_to_url() {
    let config = ChatConfig {
        webhook_url: "https://example.com/webhook".to_string(),
        webhook_token: Some("abc".to_string()),
        authorization: Some("pk".to_string()),
    };
    let client = WebhookClient::new(&config).expect("client should build");
    assert_eq!(client.url().as_str(), "https://example.com/webhook?token=abc");
}

#[tokio::test]
async fn ask_posts_plain_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook"))
        .and(query_param("token", "tok123"))
        .and(header("Authorization", "pk_test"))
        .and(body_string("What is a pipeline?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "data": { "objects": { "body": { "answers": ["A graph of components."] } } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = WebhookClient::new(&config_for(&server)).expect("client should build");
    let answer = client
        .ask("  What is a pipeline?  ", &CancellationToken::new())
        .await
        .expect("ask should succeed");

    assert_eq!(answer, "A graph of components.");
}

#[tokio::test]
async fn ask_surfaces_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = WebhookClient::new(&config_for(&server)).expect("client should build");
    let err = client
        .ask("hello", &CancellationToken::new())
        .await
        .expect_err("ask should fail");

    assert_eq!(
        err,
        ChatError::Transport {
            status: 503,
            message: "maintenance".to_string()
        }
    );
    assert_eq!(err.to_string(), "Webhook error 503: maintenance");
}

#[tokio::test]
async fn ask_rejects_malformed_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = WebhookClient::new(&config_for(&server)).expect("client should build");
    let err = client
        .ask("hello", &CancellationToken::new())
        .await
        .expect_err("ask should fail");
    assert!(matches!(err, ChatError::InvalidResponse(_)));
}

#[tokio::test]
async fn ask_blank_question() {
    let client = WebhookClient::new(&ChatConfig {
        authorization: Some("pk".to_string()),
        ..ChatConfig::default()
    })
    .expect("client should build");

    let err = client
        .ask("   ", &CancellationToken::new())
        .await
        .expect_err("blank question should fail");
    assert_eq!(err, ChatError::EmptyQuestion);
}

#[tokio::test]
async fn cancel_drops_slow_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(json!({ "status": "OK" })),
        )
        .mount(&server)
        .await;

    let client = WebhookClient::new(&config_for(&server)).expect("client should build");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = client.ask("hello", &cancel).await.expect_err("should be cancelled");
    assert_eq!(err, ChatError::Cancelled);
    assert!(started.elapsed() < Duration::from_millis(1500));
}
