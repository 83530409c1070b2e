use super::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reranker_config(uri: &str) -> Config {
    let mut config = Config::default();
    config.reranker.enabled = true;
    config.reranker.url = uri.to_string();
    config
}

#[test]
fn order_by_score_sorts_descending() {
    let items = vec!["low", "high", "mid"];
    let scores = [0.1, 0.9, 0.5];

    let ordered = order_by_score(items, &scores).expect("lengths match");

    assert_eq!(ordered, vec!["high", "mid", "low"]);
}

#[test]
fn equal_scores_keep_original_order() {
    let items = vec!["first", "second", "third"];
    let scores = [0.5, 0.5, 0.5];

    let ordered = order_by_score(items, &scores).expect("lengths match");

    assert_eq!(ordered, vec!["first", "second", "third"]);
}

#[test]
fn already_sorted_input_is_unchanged() {
    let items = vec!["a", "b", "c"];
    let scores = [0.9, 0.5, 0.1];

    let ordered = order_by_score(items, &scores).expect("lengths match");

    assert_eq!(ordered, vec!["a", "b", "c"]);
}

#[test]
fn mismatched_score_count_is_an_error() {
    let items = vec!["a", "b"];
    let scores = [0.5];

    assert!(order_by_score(items, &scores).is_err());
}

#[test]
fn output_is_a_permutation_of_the_input() {
    let items = vec!["a", "b", "c", "d"];
    let scores = [0.2, 0.8, 0.2, 0.4];

    let mut ordered = order_by_score(items, &scores).expect("lengths match");

    assert_eq!(ordered.len(), 4);
    ordered.sort_unstable();
    assert_eq!(ordered, vec!["a", "b", "c", "d"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn cross_encoder_maps_scores_back_to_input_positions() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    // Service responds sorted by score, not by input position
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"index": 2, "score": 0.97},
            {"index": 0, "score": 0.41},
            {"index": 1, "score": 0.03},
        ])))
        .mount(&server)
        .await;

    let config = reranker_config(&server.uri());
    let scores = tokio::task::spawn_blocking(move || {
        let client = CrossEncoderClient::new(&config).expect("health check passes");
        client.score(
            "where do pandas spawn",
            &[
                "Pandas are rare mobs.".to_string(),
                "Cows drop leather.".to_string(),
                "Pandas spawn in jungles.".to_string(),
            ],
        )
    })
    .await
    .expect("task completes")
    .expect("scoring succeeds");

    assert_eq!(scores, vec![0.41, 0.03, 0.97]);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_score_in_response_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"index": 0, "score": 0.5}])),
        )
        .mount(&server)
        .await;

    let config = reranker_config(&server.uri());
    let result = tokio::task::spawn_blocking(move || {
        let client = CrossEncoderClient::new(&config).expect("health check passes");
        client.score("q", &["first".to_string(), "second".to_string()])
    })
    .await
    .expect("task completes");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_service_fails_construction() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = reranker_config(&server.uri());
    let result = tokio::task::spawn_blocking(move || CrossEncoderClient::new(&config))
        .await
        .expect("task completes");

    assert!(result.is_err());
}
