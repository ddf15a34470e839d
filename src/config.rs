// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Both binaries (API server and suggestion worker) read the same variables;
//! each one only uses the part it needs.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Cloud Tasks queue carrying activity events to the suggestion worker.
pub const ACTIVITY_QUEUE_NAME: &str = "activity-suggestions";

const DEFAULT_CLIMATIQ_URL: &str = "https://api.climatiq.io/data/v1/estimate";
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Service ---
    /// Server port
    pub port: u16,
    /// GCP project ID
    pub gcp_project_id: String,
    /// GCP region hosting the Cloud Tasks queue
    pub gcp_region: String,
    /// Base URL of the suggestion worker (Cloud Tasks push target)
    pub worker_url: String,
    /// Service account used to sign task requests (OIDC), if any
    pub tasks_service_account: Option<String>,

    // --- Remote services ---
    /// Climatiq API key; remote estimation is enabled only when present
    pub climatiq_api_key: Option<String>,
    pub climatiq_url: String,
    /// Gemini API key; AI suggestions are enabled only when present
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_url: String,
    /// Timeout applied to every outbound call to a remote service
    pub remote_timeout: Duration,

    // --- Pipeline tuning ---
    /// Maximum number of cached emission estimates
    pub estimate_cache_capacity: u64,
    /// Delivery attempts before an event is dead-lettered
    pub worker_max_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: parse_var("PORT", 8080)?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            gcp_region: env::var("GCP_REGION").unwrap_or_else(|_| "us-west1".to_string()),
            worker_url: env::var("WORKER_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            tasks_service_account: optional_var("TASKS_SERVICE_ACCOUNT"),

            climatiq_api_key: optional_var("CLIMATIQ_API_KEY"),
            climatiq_url: env::var("CLIMATIQ_URL")
                .unwrap_or_else(|_| DEFAULT_CLIMATIQ_URL.to_string()),
            gemini_api_key: optional_var("GEMINI_API_KEY"),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_url: env::var("GEMINI_URL").unwrap_or_else(|_| DEFAULT_GEMINI_URL.to_string()),
            remote_timeout: Duration::from_secs(parse_var("REMOTE_TIMEOUT_SECS", 8)?),

            estimate_cache_capacity: parse_var("ESTIMATE_CACHE_CAPACITY", 1024)?,
            worker_max_attempts: parse_var("WORKER_MAX_ATTEMPTS", 5)?,
        })
    }

    /// Config for tests: no remote services, local URLs only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            gcp_project_id: "test-project".to_string(),
            gcp_region: "us-west1".to_string(),
            worker_url: "http://localhost:8081".to_string(),
            tasks_service_account: None,
            climatiq_api_key: None,
            climatiq_url: DEFAULT_CLIMATIQ_URL.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_url: DEFAULT_GEMINI_URL.to_string(),
            remote_timeout: Duration::from_secs(8),
            estimate_cache_capacity: 1024,
            worker_max_attempts: 5,
        }
    }
}

/// Read a variable, treating empty/whitespace values as unset.
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a numeric variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
