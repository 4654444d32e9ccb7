//! Sequential fan-out over keywords × calls × locations.
//!
//! Calls are issued strictly one after another: the search API rate-limits
//! per caller, so there is no concurrency here. A failed call is recorded and
//! the loop moves on; the only early exit is cancellation.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;

use crate::client::SearchClient;
use crate::config::{BatchConfig, LocationPolicy};
use crate::data_models::{
    BatchResult, CallFailure, CallOutcome, CallRecord, ExtractedDocument, KeywordBatch,
    OrganicRecord, SearchRequest, SearchResponse,
};
use crate::error::CallError;
use crate::export::{ArtifactStore, raw_response_name};
use crate::extractor::{extract_ai_overview, extract_organic};

/// Locations for calls `0..num_calls` of one keyword.
///
/// Rotation gives call `i` the location `locations[i % locations.len()]`;
/// shuffling permutes the list first and then rotates over the permutation.
pub fn assign_locations<R: rand::Rng + ?Sized>(
    locations: &[String],
    num_calls: usize,
    policy: LocationPolicy,
    rng: &mut R,
) -> Vec<String> {
    if locations.is_empty() {
        return Vec::new();
    }
    let mut order = locations.to_vec();
    if policy == LocationPolicy::Shuffle {
        order.shuffle(rng);
    }
    (0..num_calls)
        .map(|i| order[i % order.len()].clone())
        .collect()
}

pub fn new_run_id() -> String {
    format!(
        "{}-{}",
        chrono::Utc::now().format("%Y%m%dT%H%M%SZ"),
        nanoid::nanoid!(6)
    )
}

pub struct BatchDriver<C: SearchClient> {
    client: C,
    config: BatchConfig,
    store: Option<Box<dyn ArtifactStore>>,
    cancel: CancellationToken,
    rng: StdRng,
}

impl<C: SearchClient> BatchDriver<C> {
    pub fn new(client: C, config: BatchConfig) -> Self {
        Self {
            client,
            config,
            store: None,
            cancel: CancellationToken::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Raw JSON of every successful call is written here.
    pub fn with_store(mut self, store: Box<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Fixes the shuffle order, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Gives the artifact store back, e.g. to finish a zip archive.
    pub fn take_store(&mut self) -> Option<Box<dyn ArtifactStore>> {
        self.store.take()
    }

    fn request_for(&self, keyword: &str, location: &str) -> SearchRequest {
        SearchRequest {
            query: keyword.to_string(),
            location: location.to_string(),
            domain: self.config.domain.clone(),
            gl: self.config.gl.clone(),
            hl: self.config.hl.clone(),
            no_cache: self.config.no_cache,
            credential: self.config.credential.clone(),
        }
    }

    pub async fn run(&mut self) -> BatchResult {
        let mut result = BatchResult {
            run_id: new_run_id(),
            ..Default::default()
        };
        log::info!(
            "starting batch {}: {} keyword(s) x {} call(s) = {} calls, {} location(s), {:?}",
            result.run_id,
            self.config.keywords.len(),
            self.config.num_calls,
            self.config.total_calls(),
            self.config.locations.len(),
            self.config.location_policy,
        );

        let keywords = self.config.keywords.clone();
        'keywords: for keyword in &keywords {
            if self.cancel.is_cancelled() {
                log::warn!("batch cancelled before keyword {keyword:?}");
                result.cancelled = true;
                break;
            }
            let locations = assign_locations(
                &self.config.locations,
                self.config.num_calls,
                self.config.location_policy,
                &mut self.rng,
            );
            let mut batch = KeywordBatch::new(keyword.as_str());

            for (idx, location) in locations.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    log::warn!("batch cancelled before {keyword:?} call {}", idx + 1);
                    result.cancelled = true;
                    result.keywords.push(batch);
                    break 'keywords;
                }
                self.run_call(&mut batch, idx + 1, location).await;
            }

            let summary = batch.summary();
            log::info!(
                "keyword {keyword:?}: {} answered, {} without result, {} failed",
                summary.answered,
                summary.no_result,
                summary.failed
            );
            result.keywords.push(batch);
        }

        result
    }

    async fn run_call(&mut self, batch: &mut KeywordBatch, call_index: usize, location: &str) {
        let request = self.request_for(&batch.keyword, location);
        log::debug!(
            "dispatching {:?} call {call_index} at {location:?}",
            batch.keyword
        );

        match self.client.search(&request).await {
            Ok(response) => {
                let raw_html_file = response.raw_html_file().map(str::to_string);
                let outcome = match self.handle_response(batch, call_index, location, response) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        self.record_failure(batch, call_index, location, &e);
                        CallOutcome::Failed
                    }
                };
                batch.calls.push(CallRecord {
                    call_index,
                    location: location.to_string(),
                    outcome,
                    raw_html_file,
                });
                pace(self.config.pacing, &self.cancel).await;
            }
            Err(e) => {
                self.record_failure(batch, call_index, location, &e);
                batch.calls.push(CallRecord {
                    call_index,
                    location: location.to_string(),
                    outcome: CallOutcome::Failed,
                    raw_html_file: None,
                });
            }
        }
    }

    fn handle_response(
        &mut self,
        batch: &mut KeywordBatch,
        call_index: usize,
        location: &str,
        response: SearchResponse,
    ) -> Result<CallOutcome, CallError> {
        self.store_raw(&batch.keyword, call_index, location, &response);

        if let Some(msg) = response.api_error() {
            log::warn!(
                "{:?} call {call_index} at {location:?}: API reported: {msg}",
                batch.keyword
            );
        }

        let organic = extract_organic(response.organic_results(), self.config.field_policy)?;
        batch
            .organic_results
            .extend(organic.into_iter().enumerate().map(|(pos, result)| OrganicRecord {
                call_index,
                location: location.to_string(),
                position: pos + 1,
                result,
            }));

        if !response.has_answer() {
            log::info!(
                "{:?} call {call_index} at {location:?}: no answer box or AI overview",
                batch.keyword
            );
            batch.no_result_indices.insert(call_index);
            return Ok(CallOutcome::NoResult);
        }

        if let Some(overview) = response.ai_overview() {
            let (text, references) = extract_ai_overview(Some(overview));
            batch.documents.push(ExtractedDocument {
                source_keyword: batch.keyword.clone(),
                source_location: location.to_string(),
                call_index,
                text,
                references,
            });
        }
        Ok(CallOutcome::Answered)
    }

    fn record_failure(
        &self,
        batch: &mut KeywordBatch,
        call_index: usize,
        location: &str,
        err: &CallError,
    ) {
        log::warn!(
            "{:?} call {call_index} at {location:?} failed: {err}",
            batch.keyword
        );
        batch
            .failures
            .push(CallFailure::new(&batch.keyword, location, call_index, err));
    }

    fn store_raw(
        &mut self,
        keyword: &str,
        call_index: usize,
        location: &str,
        response: &SearchResponse,
    ) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        let name = raw_response_name(keyword, call_index, location);
        let stored = serde_json::to_vec_pretty(response.as_value())
            .map_err(anyhow::Error::from)
            .and_then(|bytes| store.store(&name, &bytes));
        if let Err(e) = stored {
            log::error!("error storing {name}, error: {:#}", e);
        }
    }
}

/// Waits out the pacing delay, returning early on cancellation.
async fn pace(pacing: Duration, cancel: &CancellationToken) {
    if pacing.is_zero() {
        return;
    }
    tokio::select! {
        _ = tokio::time::sleep(pacing) => {}
        _ = cancel.cancelled() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rotation_wraps_around() {
        let mut rng = StdRng::seed_from_u64(0);
        let out = assign_locations(&locs(&["L1", "L2"]), 5, LocationPolicy::Rotate, &mut rng);
        assert_eq!(out, locs(&["L1", "L2", "L1", "L2", "L1"]));
    }

    #[test]
    fn rotation_with_more_locations_than_calls() {
        let mut rng = StdRng::seed_from_u64(0);
        let out = assign_locations(&locs(&["A", "B", "C"]), 2, LocationPolicy::Rotate, &mut rng);
        assert_eq!(out, locs(&["A", "B"]));
    }

    #[test]
    fn shuffle_is_a_rotated_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let all = locs(&["A", "B", "C", "D"]);
        let out = assign_locations(&all, 8, LocationPolicy::Shuffle, &mut rng);
        let mut first_pass = out[..4].to_vec();
        assert_eq!(out[4..], out[..4]);
        first_pass.sort();
        assert_eq!(first_pass, all);
    }

    #[test]
    fn shuffle_is_reproducible_with_a_seed() {
        let all = locs(&["A", "B", "C", "D", "E"]);
        let a = assign_locations(&all, 5, LocationPolicy::Shuffle, &mut StdRng::seed_from_u64(7));
        let b = assign_locations(&all, 5, LocationPolicy::Shuffle, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(new_run_id(), new_run_id());
    }
}
