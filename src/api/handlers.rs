use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{BatchConfig, Credential, FieldPolicy, LocationPolicy};
use crate::driver::BatchDriver;
use crate::input::parse_list;

use super::AppState;
use super::models::{BatchRequest, BatchResponse, HealthResponse};

impl BatchRequest {
    pub fn into_config(self, fallback: Option<&Credential>, pacing: Duration) -> BatchConfig {
        let credential = match self.api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => Credential::new(key),
            None => fallback.cloned().unwrap_or_default(),
        };
        BatchConfig {
            keywords: parse_list(&self.keywords),
            locations: parse_list(&self.locations),
            num_calls: self.num_calls,
            domain: self.domain,
            gl: self.gl,
            hl: self.hl,
            no_cache: self.no_cache,
            credential,
            location_policy: if self.shuffle {
                LocationPolicy::Shuffle
            } else {
                LocationPolicy::Rotate
            },
            field_policy: if self.strict_fields {
                FieldPolicy::Strict
            } else {
                FieldPolicy::Lenient
            },
            pacing,
        }
    }
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn batch_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, (StatusCode, String)> {
    let start = Instant::now();

    let config = request.into_config(state.default_credential.as_ref(), state.pacing);
    config
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    // One batch at a time; queued requests wait here.
    let _guard = state.batch_lock.lock().await;

    let mut driver = BatchDriver::new(state.client.clone(), config);
    let result = driver.run().await;
    let reports = state.aggregator.report_all(&result);

    Ok(Json(BatchResponse {
        summary: result.summary(),
        run_id: result.run_id,
        cancelled: result.cancelled,
        reports,
        processing_time_ms: start.elapsed().as_millis(),
    }))
}
