//! Errors raised while configuring the tap or syncing a stream

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a tap-segment run
#[derive(Error, Debug)]
pub enum Error {
    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------
    #[error("could not read config file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is missing required field '{field}'")]
    MissingConfigField { field: String },

    #[error("config field '{field}' is invalid: {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("cannot authenticate: {message}")]
    Auth { message: String },

    // ------------------------------------------------------------------
    // Talking to the Segment API
    // ------------------------------------------------------------------
    #[error("request to Segment failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Segment answered HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Segment rate limit exceeded")]
    RateLimited { retry_after: Option<u64> },

    #[error("no answer from Segment within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("response body is not usable: {message}")]
    Decode { message: String },

    #[error("bad JSONPath '{path}': {message}")]
    JsonPath { path: String, message: String },

    // ------------------------------------------------------------------
    // Record handling
    // ------------------------------------------------------------------
    #[error("Stream '{stream}': field '{field}' value {value} is not an integer")]
    Coercion {
        stream: String,
        field: String,
        value: String,
    },

    #[error("Stream '{stream}': record does not match schema: {message}")]
    SchemaValidation { stream: String, message: String },

    #[error("Stream '{stream}': record has no value for replication key '{key}'")]
    MissingReplicationKey { stream: String, key: String },

    #[error("Stream '{stream}': API returned the same page token twice ({token})")]
    PaginationLoop { stream: String, token: String },

    #[error("unknown stream '{stream}'")]
    StreamNotFound { stream: String },

    // ------------------------------------------------------------------
    // Bookmarks
    // ------------------------------------------------------------------
    #[error("state: {message}")]
    State { message: String },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn schema(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            stream: stream.into(),
            message: message.into(),
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Whether sending the same request again may succeed.
    ///
    /// Segment sheds load with 429 and the 5xx gateway codes; connection
    /// failures and timeouts are transient too. Everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            Self::Transport(e) => e.is_connect(),
            Self::Context { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Label an error with what was being attempted
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.with_context(|| context.into())
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|source| Error::Context {
            context: f(),
            source: Box::new(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_stream_and_field() {
        let err = Error::Coercion {
            stream: "workspace_mtu_usage_daily".to_string(),
            field: "anonymous".to_string(),
            value: "\"abc\"".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Stream 'workspace_mtu_usage_daily': field 'anonymous' value \"abc\" is not an integer"
        );
        assert_eq!(
            Error::missing_field("api_token").to_string(),
            "config is missing required field 'api_token'"
        );
        assert_eq!(
            Error::http_status(401, "Unauthorized").to_string(),
            "Segment answered HTTP 401: Unauthorized"
        );
    }

    #[test]
    fn test_segment_throttling_and_outages_are_retryable() {
        assert!(Error::RateLimited { retry_after: None }.is_retryable());
        assert!(Error::Timeout { timeout_ms: 30_000 }.is_retryable());
        for status in [500, 502, 503, 504] {
            assert!(Error::http_status(status, "").is_retryable(), "{status}");
        }
    }

    #[test]
    fn test_client_and_record_errors_are_final() {
        for status in [400, 401, 403, 404, 422] {
            assert!(!Error::http_status(status, "").is_retryable(), "{status}");
        }
        assert!(!Error::schema("events_volume_daily", "bad").is_retryable());
        assert!(!Error::PaginationLoop {
            stream: "s".to_string(),
            token: "MTAw".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn test_context_wraps_and_keeps_source() {
        let result: Result<()> = Err(Error::state("unreadable"));
        let err = result.context("--state-json").unwrap_err();

        assert_eq!(err.to_string(), "--state-json: state: unreadable");
        assert!(matches!(err, Error::Context { ref source, .. } if matches!(**source, Error::State { .. })));
    }

    #[test]
    fn test_context_preserves_retryability() {
        let result: Result<()> = Err(Error::http_status(503, ""));
        let err = result
            .with_context(|| "stream workspace_api_calls_daily".to_string())
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
