//! Tap configuration
//!
//! `TapConfig` is deserialized from inline JSON, a `.json` file or a
//! `.yaml`/`.yml` file, then validated before any request is made.

use crate::auth::Authenticator;
use crate::error::{Error, Result};
use crate::http::HttpClientConfig;
use crate::source::{LookbackPolicy, RequestContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::Path;

/// Default API host
pub const DEFAULT_BASE_URL: &str = "https://api.segmentapis.com";

// ============================================================================
// Tap Config
// ============================================================================

/// Complete tap configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Segment Public API token
    #[serde(default)]
    pub api_token: String,

    /// Earliest timestamp to extract when no checkpoint exists
    #[serde(default = "default_start_date")]
    pub start_date: DateTime<Utc>,

    /// API host
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Page size hint sent with every request
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Maximum retries per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Client-side request rate
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Lookback floors for the windowed streams
    #[serde(default)]
    pub lookback: LookbackPolicy,
}

fn default_start_date() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_672_531_200, 0).unwrap_or_default()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_rps() -> u32 {
    10
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            start_date: default_start_date(),
            base_url: default_base_url(),
            page_size: default_page_size(),
            user_agent: None,
            max_retries: default_max_retries(),
            requests_per_second: default_rps(),
            lookback: LookbackPolicy::default(),
        }
    }
}

impl fmt::Debug for TapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TapConfig")
            .field("api_token", &"[REDACTED]")
            .field("start_date", &self.start_date)
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("requests_per_second", &self.requests_per_second)
            .field("lookback", &self.lookback)
            .finish()
    }
}

impl TapConfig {
    /// Create a config with the given token and defaults elsewhere
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            ..Self::default()
        }
    }

    /// Parse and validate inline JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate inline YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&contents),
            _ => Self::from_json(&contents),
        }
    }

    /// Override the API host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the start date
    #[must_use]
    pub fn with_start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = start_date;
        self
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(Error::missing_field("api_token"));
        }

        if self.base_url.trim().is_empty() {
            return Err(Error::invalid_value("base_url", "must not be empty"));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;

        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be at least 1"));
        }

        Ok(())
    }

    /// Bearer authenticator for the configured token
    pub fn authenticator(&self) -> Authenticator {
        Authenticator::bearer(&self.api_token)
    }

    /// HTTP client settings derived from this config
    pub fn http_config(&self) -> HttpClientConfig {
        let mut http = HttpClientConfig::new(&self.base_url);
        http.max_retries = self.max_retries;
        http.requests_per_second = (self.requests_per_second > 0).then_some(self.requests_per_second);
        if let Some(agent) = &self.user_agent {
            http.user_agent.clone_from(agent);
        }
        http
    }

    /// Request context for a stream resuming from `checkpoint`
    pub fn request_context(&self, checkpoint: Option<DateTime<Utc>>) -> RequestContext {
        RequestContext::new(self.start_date, self.page_size).with_checkpoint(checkpoint)
    }

    /// JSON Schema describing this config, for the `spec` command
    pub fn json_schema() -> Value {
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "required": ["api_token"],
            "properties": {
                "api_token": {
                    "type": "string",
                    "title": "API Token",
                    "description": "Segment Public API token",
                    "secret": true
                },
                "start_date": {
                    "type": "string",
                    "format": "date-time",
                    "default": "2023-01-01T00:00:00Z"
                },
                "base_url": {"type": "string", "default": DEFAULT_BASE_URL},
                "page_size": {"type": "integer", "minimum": 1, "default": 100},
                "user_agent": {"type": "string"},
                "max_retries": {"type": "integer", "minimum": 0, "default": 3},
                "requests_per_second": {"type": "integer", "minimum": 0, "default": 10},
                "lookback": {
                    "type": "object",
                    "properties": {
                        "volume_years": {"type": ["integer", "null"], "default": 2},
                        "monthly_years": {"type": ["integer", "null"], "default": null}
                    }
                }
            }
        })
    }
}
