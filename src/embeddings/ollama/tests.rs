use super::*;
use crate::config::EmbeddingConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(host: &str, port: u16, batch_size: u32) -> Config {
    Config {
        embedding: EmbeddingConfig {
            host: host.to_string(),
            port,
            model: "test-model".to_string(),
            batch_size,
            ..EmbeddingConfig::default()
        },
        ..Config::default()
    }
}

fn client_for(server: &MockServer, batch_size: u32) -> OllamaClient {
    let address = server.address();
    OllamaClient::new(&config_for(&address.ip().to_string(), address.port(), batch_size))
        .expect("Failed to create client")
        .with_retry_attempts(2)
        .with_backoff(Duration::from_millis(1))
}

#[test]
fn client_configuration() {
    let client = OllamaClient::new(&config_for("test-host", 1234, 128))
        .expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
    assert_eq!(client.model_id(), "ollama:test-model");
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&Config::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5)
        .with_backoff(Duration::from_millis(10));

    assert_eq!(client.retry_attempts, 5);
    assert_eq!(client.backoff_base_ms, 10);
}

#[test]
fn embed_request_uses_input_array() {
    let texts = vec!["one".to_string()];
    let request = EmbedRequest {
        model: "m",
        input: &texts,
    };
    let value = serde_json::to_value(&request).expect("request serializes");
    assert_eq!(value, json!({"model": "m", "input": ["one"]}));
}

#[tokio::test(flavor = "multi_thread")]
async fn embeds_in_configured_batches() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["a", "b"]})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"embeddings": [[1.0, 0.0], [0.0, 1.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["c"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.5, 0.5]]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let embeddings = tokio::task::spawn_blocking(move || client.embed(&texts))
        .await
        .expect("task joins")
        .expect("embedding succeeds");

    assert_eq!(embeddings.len(), 3);
    assert_eq!(embeddings[0].as_slice(), &[1.0, 0.0]);
    assert_eq!(embeddings[2].as_slice(), &[0.5, 0.5]);
}

#[tokio::test(flavor = "multi_thread")]
async fn single_query_goes_through_batch_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["what about burns?"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.1, 0.2, 0.3]]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let embedding = tokio::task::spawn_blocking(move || client.embed_one("what about burns?"))
        .await
        .expect("task joins")
        .expect("embedding succeeds");

    assert_eq!(embedding.dimension(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn count_mismatch_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0]]})))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let texts = vec!["a".to_string(), "b".to_string()];
    let result = tokio::task::spawn_blocking(move || client.embed(&texts))
        .await
        .expect("task joins");

    assert!(matches!(result, Err(RagError::Embedding(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "model not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let result = tokio::task::spawn_blocking(move || client.embed_one("hello"))
        .await
        .expect("task joins");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let result = tokio::task::spawn_blocking(move || client.embed_one("hello"))
        .await
        .expect("task joins");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_accepts_latest_tag() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "test-model:latest"}, {"name": "other:7b"}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let result = tokio::task::spawn_blocking(move || client.health_check())
        .await
        .expect("task joins");

    assert!(result.is_ok());
}

#[test]
fn backoff_doubles_per_attempt() {
    let client = OllamaClient::new(&config_for("localhost", 11434, 4))
        .expect("client builds")
        .with_backoff(Duration::from_millis(100));

    assert_eq!(client.backoff_delay(1), Duration::from_millis(100));
    assert_eq!(client.backoff_delay(2), Duration::from_millis(200));
    assert_eq!(client.backoff_delay(3), Duration::from_millis(400));
}

#[test]
fn only_server_and_transport_failures_are_transient() {
    assert!(is_transient(&ureq::Error::StatusCode(503)));
    assert!(is_transient(&ureq::Error::ConnectionFailed));
    assert!(!is_transient(&ureq::Error::StatusCode(404)));
    assert!(is_transient(&ureq::Error::HostNotFound));
    assert!(!is_transient(&ureq::Error::StatusCode(400)));
}
