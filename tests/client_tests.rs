use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use serpsim::client::{SearchClient, SerpApiClient};
use serpsim::config::Credential;
use serpsim::data_models::SearchRequest;
use serpsim::error::{CallError, CallErrorKind};

fn request() -> SearchRequest {
    SearchRequest {
        query: "best coffee".into(),
        location: "Austin, Texas".into(),
        domain: "google.com".into(),
        gl: "us".into(),
        hl: "en".into(),
        no_cache: false,
        credential: Credential::new("secret"),
    }
}

fn client(server: &MockServer) -> SerpApiClient {
    SerpApiClient::new(format!("{}/search.json", server.uri()), Duration::from_secs(2))
        .unwrap_or_else(|e| panic!("client: {e:#}"))
}

#[tokio::test]
async fn sends_every_engine_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("engine", "google"))
        .and(query_param("q", "best coffee"))
        .and(query_param("location", "Austin, Texas"))
        .and(query_param("google_domain", "google.com"))
        .and(query_param("gl", "us"))
        .and(query_param("hl", "en"))
        .and(query_param("no_cache", "false"))
        .and(query_param("api_key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "search_metadata": {"raw_html_file": "https://serpapi.com/raw/abc.html"},
            "answer_box": {"answer": "espresso"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .search(&request())
        .await
        .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
    assert!(response.has_answer());
    assert_eq!(
        response.raw_html_file(),
        Some("https://serpapi.com/raw/abc.html")
    );
}

#[tokio::test]
async fn server_error_is_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = client(&server).search(&request()).await.unwrap_err();
    match err {
        CallError::HttpStatus { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("Internal Server Error"));
        }
        other => panic!("Expected HttpStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn long_error_bodies_are_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("x".repeat(5000)))
        .mount(&server)
        .await;

    let err = client(&server).search(&request()).await.unwrap_err();
    let CallError::HttpStatus { status, body } = err else {
        panic!("Expected HttpStatus, got: {err:?}");
    };
    assert_eq!(status, 401);
    assert!(body.len() < 300);
}

#[tokio::test]
async fn empty_body_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = client(&server).search(&request()).await.unwrap_err();
    assert_eq!(err.kind(), CallErrorKind::EmptyResponseError);
}

#[tokio::test]
async fn malformed_body_is_json_parse() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"organic_results\": ["))
        .mount(&server)
        .await;

    let err = client(&server).search(&request()).await.unwrap_err();
    assert_eq!(err.kind(), CallErrorKind::JsonParseError);
}

#[tokio::test]
async fn api_error_field_still_parses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": "Invalid API key."})),
        )
        .mount(&server)
        .await;

    let response = client(&server)
        .search(&request())
        .await
        .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
    assert_eq!(response.api_error(), Some("Invalid API key."));
    assert!(!response.has_answer());
}

#[tokio::test]
async fn slow_server_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let client = SerpApiClient::new(server.uri(), Duration::from_millis(200))
        .unwrap_or_else(|e| panic!("client: {e:#}"));
    let err = client.search(&request()).await.unwrap_err();
    assert_eq!(err.kind(), CallErrorKind::NetworkError);
}

#[tokio::test]
async fn unreachable_host_is_network_error() {
    let client = SerpApiClient::new("http://127.0.0.1:9/search.json", Duration::from_secs(2))
        .unwrap_or_else(|e| panic!("client: {e:#}"));
    let err = client.search(&request()).await.unwrap_err();
    assert_eq!(err.kind(), CallErrorKind::NetworkError);
}
