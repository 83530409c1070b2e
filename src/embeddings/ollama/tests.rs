use super::*;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::settings::OllamaConfig;

fn config_for(uri: &str) -> Config {
    let url = Url::parse(uri).expect("mock url parses");
    let mut config = Config::default();
    config.ollama.protocol = url.scheme().to_string();
    config.ollama.host = url.host_str().expect("mock url has host").to_string();
    config.ollama.port = url.port().expect("mock url has port");
    config
}

#[test]
fn client_configuration() {
    let config = Config {
        ollama: OllamaConfig {
            host: "test-host".to_string(),
            port: 1234,
            embedding_model: "test-model".to_string(),
            batch_size: 128,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };
    let client = EmbeddingClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn empty_document_list_makes_no_requests() {
    let config = Config::default();
    let client = EmbeddingClient::new(&config).expect("Failed to create client");

    let embeddings = client.embed_documents(&[]).expect("empty input succeeds");

    assert!(embeddings.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn documents_are_prefixed_and_batched() {
    let server = MockServer::start().await;

    // batch_size 2 splits three texts into a pair and a singleton
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_string_contains("search_document: Third chunk."))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.3, 0.3]]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_string_contains("search_document: First chunk."))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.1, 0.1], [0.2, 0.2]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server.uri());
    config.ollama.batch_size = 2;

    let client = EmbeddingClient::new(&config).expect("client builds");
    let texts = vec![
        "First chunk.".to_string(),
        "Second chunk.".to_string(),
        "Third chunk.".to_string(),
    ];
    let embeddings = tokio::task::spawn_blocking(move || client.embed_documents(&texts))
        .await
        .expect("task completes")
        .expect("embedding succeeds");

    assert_eq!(
        embeddings,
        vec![vec![0.1, 0.1], vec![0.2, 0.2], vec![0.3, 0.3]]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn queries_use_the_query_prefix() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_string_contains("search_query: where do pandas spawn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.5, 0.5]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let client = EmbeddingClient::new(&config).expect("client builds");

    let embedding = tokio::task::spawn_blocking(move || client.embed_query("where do pandas spawn"))
        .await
        .expect("task completes")
        .expect("embedding succeeds");

    assert_eq!(embedding, vec![0.5, 0.5]);
}

#[tokio::test(flavor = "multi_thread")]
async fn mismatched_embedding_count_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.1, 0.1], [0.2, 0.2]]
        })))
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let client = EmbeddingClient::new(&config).expect("client builds");

    let result =
        tokio::task::spawn_blocking(move || client.embed_documents(&["only one".to_string()]))
            .await
            .expect("task completes");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_requires_the_configured_model() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "some-other-model", "size": 100, "digest": "abc"}
            ]
        })))
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let client = EmbeddingClient::new(&config).expect("client builds");

    let result = tokio::task::spawn_blocking(move || client.health_check())
        .await
        .expect("task completes");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_passes_when_model_is_present() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "nomic-embed-text:latest", "size": 100, "digest": "abc"}
            ]
        })))
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let client = EmbeddingClient::new(&config).expect("client builds");

    let result = tokio::task::spawn_blocking(move || client.health_check())
        .await
        .expect("task completes");

    assert!(result.is_ok(), "health check should pass: {result:?}");
}
