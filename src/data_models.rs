use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Credential;
use crate::error::{CallError, CallErrorKind};

/// Parameters of one external search call. Built fresh for every
/// (keyword, location, call) combination.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub location: String,
    pub domain: String,
    pub gl: String,
    pub hl: String,
    pub no_cache: bool,
    pub credential: Credential,
}

impl SearchRequest {
    /// Query-string pairs in the shape the search endpoint expects.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("engine", "google".to_string()),
            ("q", self.query.clone()),
            ("location", self.location.clone()),
            ("google_domain", self.domain.clone()),
            ("gl", self.gl.clone()),
            ("hl", self.hl.clone()),
            ("no_cache", self.no_cache.to_string()),
            ("api_key", self.credential.expose().to_string()),
        ]
    }
}

/// Raw response body. No schema is assumed; the accessors return `None`
/// for absent keys and for explicit `null`s.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse(Value);

impl SearchResponse {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn answer_box(&self) -> Option<&Value> {
        self.field("answer_box")
    }

    pub fn ai_overview(&self) -> Option<&Value> {
        self.field("ai_overview")
    }

    pub fn organic_results(&self) -> Option<&Value> {
        self.field("organic_results")
    }

    pub fn raw_html_file(&self) -> Option<&str> {
        self.field("search_metadata")?
            .get("raw_html_file")
            .and_then(Value::as_str)
    }

    /// Top-level `error` message the API reports inside a 2xx body.
    pub fn api_error(&self) -> Option<&str> {
        self.field("error").and_then(Value::as_str)
    }

    /// True when the call produced an answer box or an AI overview.
    pub fn has_answer(&self) -> bool {
        self.answer_box().is_some() || self.ai_overview().is_some()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub title: String,
    pub link: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OrganicResult {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

/// Text pulled from one call's AI overview.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub source_keyword: String,
    pub source_location: String,
    /// 1-based index of the call within its keyword.
    pub call_index: usize,
    pub text: String,
    pub references: Vec<Reference>,
}

/// One organic result, tagged with the call that returned it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OrganicRecord {
    pub call_index: usize,
    pub location: String,
    /// 1-based rank within the call's result list.
    pub position: usize,
    #[serde(flatten)]
    pub result: OrganicResult,
}

#[derive(Serialize, Debug, Clone)]
pub struct CallFailure {
    pub keyword: String,
    pub location: String,
    pub call_index: usize,
    pub kind: CallErrorKind,
    pub detail: String,
}

impl CallFailure {
    pub fn new(keyword: &str, location: &str, call_index: usize, err: &CallError) -> Self {
        Self {
            keyword: keyword.to_string(),
            location: location.to_string(),
            call_index,
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// Succeeded with an answer box and/or AI overview.
    Answered,
    /// Succeeded, but neither an answer box nor an AI overview came back.
    NoResult,
    Failed,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub call_index: usize,
    pub location: String,
    pub outcome: CallOutcome,
    pub raw_html_file: Option<String>,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallSummary {
    pub answered: usize,
    pub no_result: usize,
    pub failed: usize,
}

impl CallSummary {
    pub fn total(&self) -> usize {
        self.answered + self.no_result + self.failed
    }
}

/// Everything collected for one keyword during a batch.
#[derive(Serialize, Debug, Clone, Default)]
pub struct KeywordBatch {
    pub keyword: String,
    pub documents: Vec<ExtractedDocument>,
    pub organic_results: Vec<OrganicRecord>,
    /// 1-based indices of calls that returned no answer box or AI overview.
    pub no_result_indices: BTreeSet<usize>,
    pub failures: Vec<CallFailure>,
    pub calls: Vec<CallRecord>,
}

impl KeywordBatch {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Default::default()
        }
    }

    pub fn summary(&self) -> CallSummary {
        self.calls
            .iter()
            .fold(CallSummary::default(), |mut acc, call| {
                match call.outcome {
                    CallOutcome::Answered => acc.answered += 1,
                    CallOutcome::NoResult => acc.no_result += 1,
                    CallOutcome::Failed => acc.failed += 1,
                }
                acc
            })
    }

    /// AI-overview reference links across all documents, in document order.
    pub fn reference_links(&self) -> impl Iterator<Item = &str> {
        self.documents
            .iter()
            .flat_map(|d| d.references.iter().map(|r| r.link.as_str()))
    }

    pub fn organic_links(&self) -> impl Iterator<Item = &str> {
        self.organic_results.iter().map(|r| r.result.link.as_str())
    }
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct BatchResult {
    pub run_id: String,
    pub keywords: Vec<KeywordBatch>,
    /// Set when the run stopped early on a cancellation request.
    pub cancelled: bool,
}

impl BatchResult {
    pub fn summary(&self) -> CallSummary {
        self.keywords
            .iter()
            .map(KeywordBatch::summary)
            .fold(CallSummary::default(), |acc, s| CallSummary {
                answered: acc.answered + s.answered,
                no_result: acc.no_result + s.no_result,
                failed: acc.failed + s.failed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_pairs_carry_every_parameter() {
        let req = SearchRequest {
            query: "coffee".into(),
            location: "Austin, Texas".into(),
            domain: "google.com".into(),
            gl: "us".into(),
            hl: "en".into(),
            no_cache: true,
            credential: Credential::new("k"),
        };
        let pairs = req.query_pairs();
        let get = |k: &str| {
            pairs
                .iter()
                .find(|(name, _)| *name == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("engine"), Some("google"));
        assert_eq!(get("q"), Some("coffee"));
        assert_eq!(get("location"), Some("Austin, Texas"));
        assert_eq!(get("google_domain"), Some("google.com"));
        assert_eq!(get("no_cache"), Some("true"));
        assert_eq!(get("api_key"), Some("k"));
    }

    #[test]
    fn null_fields_count_as_absent() {
        let resp = SearchResponse::new(json!({"ai_overview": null, "answer_box": null}));
        assert!(resp.ai_overview().is_none());
        assert!(!resp.has_answer());
    }

    #[test]
    fn answer_box_alone_is_an_answer() {
        let resp = SearchResponse::new(json!({"answer_box": {"answer": "42"}}));
        assert!(resp.has_answer());
    }

    #[test]
    fn raw_html_file_is_nested() {
        let resp = SearchResponse::new(json!({
            "search_metadata": {"raw_html_file": "https://serpapi.com/raw/1.html"}
        }));
        assert_eq!(resp.raw_html_file(), Some("https://serpapi.com/raw/1.html"));
    }

    #[test]
    fn summary_counts_each_outcome() {
        let mut batch = KeywordBatch::new("k");
        for (idx, outcome) in [
            CallOutcome::Answered,
            CallOutcome::NoResult,
            CallOutcome::Failed,
            CallOutcome::Answered,
        ]
        .into_iter()
        .enumerate()
        {
            batch.calls.push(CallRecord {
                call_index: idx + 1,
                location: "L".into(),
                outcome,
                raw_html_file: None,
            });
        }
        let summary = batch.summary();
        assert_eq!(
            summary,
            CallSummary {
                answered: 2,
                no_result: 1,
                failed: 1
            }
        );
        assert_eq!(summary.total(), 4);
    }
}
