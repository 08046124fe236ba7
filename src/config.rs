use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_EXPANSION_TIMEOUT_MS: u64 = 4_000;
const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct RankerConfig {
    /// Bounded wait on the expander before falling back.
    pub expansion_timeout: Duration,
    /// Candidate count at which scoring moves onto the rayon pool.
    pub parallel_threshold: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            expansion_timeout: Duration::from_millis(DEFAULT_EXPANSION_TIMEOUT_MS),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl RankerConfig {
    /// Reads `FUZZY_RANK_EXPANSION_TIMEOUT_MS` and `FUZZY_RANK_PARALLEL_THRESHOLD`;
    /// unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let expansion_timeout = parse_var::<u64>("FUZZY_RANK_EXPANSION_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.expansion_timeout);
        let parallel_threshold =
            parse_var("FUZZY_RANK_PARALLEL_THRESHOLD").unwrap_or(defaults.parallel_threshold);

        Self {
            expansion_timeout,
            parallel_threshold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub request_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_EXPANSION_TIMEOUT_MS),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key =
            env::var("GEMINI_API_KEY").context("GEMINI_API_KEY environment variable not set")?;
        let mut config = Self::new(api_key);
        if let Ok(model) = env::var("FUZZY_RANK_MODEL") {
            config.model = model;
        }
        if let Some(ms) = parse_var::<u64>("FUZZY_RANK_EXPANSION_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
