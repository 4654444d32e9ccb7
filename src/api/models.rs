use serde::{Deserialize, Serialize};

use crate::aggregator::KeywordReport;
use crate::data_models::CallSummary;

fn default_num_calls() -> usize {
    1
}

fn default_domain() -> String {
    "google.com".to_string()
}

fn default_gl() -> String {
    "us".to_string()
}

fn default_hl() -> String {
    "en".to_string()
}

/// Form fields of one batch, in the same shape a user types them.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// Semicolon-separated keywords.
    pub keywords: String,
    /// Semicolon-separated locations.
    pub locations: String,
    #[serde(default = "default_num_calls")]
    pub num_calls: usize,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_gl")]
    pub gl: String,
    #[serde(default = "default_hl")]
    pub hl: String,
    #[serde(default)]
    pub no_cache: bool,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub strict_fields: bool,
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub run_id: String,
    pub cancelled: bool,
    pub summary: CallSummary,
    pub reports: Vec<KeywordReport>,
    pub processing_time_ms: u128,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
