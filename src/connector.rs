//! The tap's public operations, wired to config, bookmarks and the engine

use crate::config::TapConfig;
use crate::engine::{MessageStream, SyncConfig, SyncEngine};
use crate::error::Result;
use crate::http::HttpClient;
use crate::state::StateManager;
use crate::streams;
use crate::types::{Clock, SystemClock};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// What `spec` prints: identity plus the accepted config schema
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    #[serde(rename = "connectionSpecification")]
    pub config_schema: Value,
}

/// Outcome of `check`, printed as a `CONNECTION_STATUS` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// `SUCCEEDED` or `FAILED` on the wire
    #[serde(serialize_with = "check_status")]
    pub status: bool,
    pub message: String,
}

impl CheckResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
        }
    }
}

fn check_status<S: serde::Serializer>(ok: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(if *ok { "SUCCEEDED" } else { "FAILED" })
}

/// Which streams `read` covers and how often it checkpoints
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Comma-separated stream names; `None` reads every stream
    pub streams: Option<String>,
    pub emit_state_per_page: bool,
}

/// The four operations a Singer-style tap answers
#[async_trait]
pub trait Connector: Send + Sync {
    fn spec(&self) -> ConnectorSpec;

    /// Verify the credentials with a single request. API failures become a
    /// failed `CheckResult`; only setup problems are errors.
    async fn check(&self) -> Result<CheckResult>;

    async fn discover(&self) -> Result<Value>;

    /// Messages of every selected stream, in registry order, produced as
    /// the returned stream is polled
    async fn read(&self, options: ReadOptions) -> Result<MessageStream>;
}

/// The Segment usage and event-volume connector
pub struct SegmentConnector {
    config: TapConfig,
    state: StateManager,
    clock: Arc<dyn Clock>,
}

impl SegmentConnector {
    /// Rejects an invalid config before any request is made
    pub fn new(config: TapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: StateManager::in_memory(),
            clock: Arc::new(SystemClock),
        })
    }

    #[must_use]
    pub fn with_state(mut self, state: StateManager) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Spec of this tap; needs no config
    pub fn describe() -> ConnectorSpec {
        ConnectorSpec {
            name: crate::NAME,
            title: "Segment",
            description: "Daily API-call, event-volume and MTU usage from the Segment Public API",
            config_schema: TapConfig::json_schema(),
        }
    }

    fn engine(&self, emit_state_per_page: bool) -> Result<SyncEngine> {
        let client = HttpClient::new(self.config.http_config(), self.config.authenticator())?;
        let sync_config =
            SyncConfig::from_tap(&self.config).with_state_per_page(emit_state_per_page);

        Ok(SyncEngine::new(client, self.state.clone())
            .with_config(sync_config)
            .with_clock(Arc::clone(&self.clock)))
    }
}

#[async_trait]
impl Connector for SegmentConnector {
    fn spec(&self) -> ConnectorSpec {
        Self::describe()
    }

    async fn check(&self) -> Result<CheckResult> {
        let engine = self.engine(false)?;
        let stream = streams::find("workspace_api_calls_daily")?;

        match engine.sample_page(stream).await {
            Ok(count) => {
                info!(stream = stream.name, records = count, "connection check passed");
                Ok(CheckResult::success(format!(
                    "{} returned {count} records",
                    stream.path
                )))
            }
            Err(e) => {
                warn!(error = %e, "connection check failed");
                Ok(CheckResult::failure(e.to_string()))
            }
        }
    }

    async fn discover(&self) -> Result<Value> {
        Ok(streams::catalog())
    }

    async fn read(&self, options: ReadOptions) -> Result<MessageStream> {
        let selected = streams::select(options.streams.as_deref())?;
        let engine = Arc::new(self.engine(options.emit_state_per_page)?);

        let messages = stream::iter(selected)
            .then(move |definition| {
                let engine = Arc::clone(&engine);
                async move { engine.read_stream(definition).await }
            })
            .try_flatten();

        Ok(Box::pin(messages))
    }
}
