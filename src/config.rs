use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com/search.json";

/// Upper bound on calls per keyword accepted at the input boundary.
pub const MAX_CALLS_PER_KEYWORD: usize = 10;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        api_key: env::var("SERPAPI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
        base_url: get_env_or_default("SERPAPI_BASE_URL", DEFAULT_BASE_URL),
        pacing_ms: get_env_parsed_or_default("SERPSIM_PACING_MS", 1000),
        timeout_secs: get_env_parsed_or_default("SERPSIM_TIMEOUT_SECS", 30),
        bind_addr: get_env_or_default("SERPSIM_BIND_ADDR", "127.0.0.1:3000"),
    }
});

pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub pacing_ms: u64,
    pub timeout_secs: u64,
    pub bind_addr: String,
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed_or_default(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("ignoring invalid {key}={raw:?}, using {default}");
            default
        }),
        Err(_) => default,
    }
}

/// API key wrapper that keeps the secret out of `Debug` output and logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// How locations are assigned to the calls of one keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationPolicy {
    /// Call `i` uses `locations[i % locations.len()]`.
    #[default]
    Rotate,
    /// Shuffle the list once per keyword, then rotate over the shuffled list.
    Shuffle,
}

/// What to do when an organic result lacks `title`, `snippet` or `link`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldPolicy {
    /// Substitute a placeholder.
    #[default]
    Lenient,
    /// Fail the call with `MissingField`.
    Strict,
}

/// Everything the batch driver needs for one invocation. Built once at the
/// input boundary, validated, then handed to the driver by value.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub keywords: Vec<String>,
    pub locations: Vec<String>,
    pub num_calls: usize,
    pub domain: String,
    pub gl: String,
    pub hl: String,
    pub no_cache: bool,
    pub credential: Credential,
    pub location_policy: LocationPolicy,
    pub field_policy: FieldPolicy,
    pub pacing: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            locations: Vec::new(),
            num_calls: 1,
            domain: "google.com".to_string(),
            gl: "us".to_string(),
            hl: "en".to_string(),
            no_cache: false,
            credential: Credential::default(),
            location_policy: LocationPolicy::Rotate,
            field_policy: FieldPolicy::Lenient,
            pacing: Duration::from_secs(1),
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keywords.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one keyword is required".into(),
            ));
        }
        if self.locations.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one location is required".into(),
            ));
        }
        if !(1..=MAX_CALLS_PER_KEYWORD).contains(&self.num_calls) {
            return Err(ConfigError::Invalid(format!(
                "num_calls must be between 1 and {MAX_CALLS_PER_KEYWORD}, got {}",
                self.num_calls
            )));
        }
        if self.domain.trim().is_empty() {
            return Err(ConfigError::Invalid("domain must not be empty".into()));
        }
        if self.credential.is_empty() {
            return Err(ConfigError::Invalid("an API key is required".into()));
        }
        Ok(())
    }

    /// Total number of calls a full run will issue.
    pub fn total_calls(&self) -> usize {
        self.keywords.len() * self.num_calls
    }
}
