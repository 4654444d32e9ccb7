use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::data_models::{SearchRequest, SearchResponse};
use crate::error::CallError;

/// Longest slice of an error body kept in a [`CallError::HttpStatus`].
const MAX_ERROR_BODY: usize = 200;

/// The one capability the batch driver needs from the outside world.
pub trait SearchClient: Send + Sync {
    fn search(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<SearchResponse, CallError>> + Send;
}

/// SerpAPI-compatible HTTP client.
#[derive(Clone, Debug)]
pub struct SerpApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl SerpApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("serpsim/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

/// Cuts `body` to at most `max` characters, marking the cut with `...`.
pub fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Classifies a response body: empty, not JSON, or not a JSON object are failures.
pub fn parse_body(body: &str) -> Result<SearchResponse, CallError> {
    if body.trim().is_empty() {
        return Err(CallError::EmptyResponse);
    }
    let value: Value =
        serde_json::from_str(body).map_err(|e| CallError::JsonParse(e.to_string()))?;
    if !value.is_object() {
        return Err(CallError::JsonParse(format!(
            "expected a JSON object, got {}",
            truncate(&value.to_string(), 40)
        )));
    }
    Ok(SearchResponse::new(value))
}

impl SearchClient for SerpApiClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, CallError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&request.query_pairs())
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(CallError::HttpStatus {
                status: status.as_u16(),
                body: truncate(body.trim(), MAX_ERROR_BODY),
            });
        }

        parse_body(&body)
    }
}
