//! Singer messages and sync bookkeeping

use crate::config::TapConfig;
use crate::error::Result;
use crate::source::LookbackPolicy;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::Stream;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;

/// Lazily produced messages of one stream
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message>> + Send>>;

/// One line of Singer output.
///
/// Serializes to the wire form directly: `{"type": "RECORD", "stream": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    Schema {
        stream: String,
        schema: Value,
        key_properties: Vec<String>,
        bookmark_properties: Vec<String>,
    },
    Record {
        stream: String,
        record: Value,
        #[serde(serialize_with = "singer_timestamp")]
        time_extracted: DateTime<Utc>,
    },
    /// `value` is the full `{"bookmarks": {...}}` document
    State { value: Value },
}

impl Message {
    pub fn record(stream: impl Into<String>, record: Value, time_extracted: DateTime<Utc>) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted,
        }
    }

    pub fn state(value: Value) -> Self {
        Self::State { value }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }
}

fn singer_timestamp<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Run-wide settings every stream driver shares
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Used when a stream has no checkpoint yet
    pub start_date: DateTime<Utc>,
    pub page_size: u32,
    pub lookback: LookbackPolicy,
    /// Persist and emit STATE after every page, not only at stream end
    pub emit_state_per_page: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_tap(&TapConfig::default())
    }
}

impl SyncConfig {
    pub fn from_tap(config: &TapConfig) -> Self {
        Self {
            start_date: config.start_date,
            page_size: config.page_size,
            lookback: config.lookback,
            emit_state_per_page: false,
        }
    }

    #[must_use]
    pub fn with_state_per_page(mut self, emit: bool) -> Self {
        self.emit_state_per_page = emit;
        self
    }
}

/// Counters for one stream, or summed over a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub records_synced: usize,
    pub pages_fetched: usize,
    pub streams_synced: usize,
    pub errors: usize,
    pub duration_ms: u64,
}

impl SyncStats {
    /// Count one fetched page and the records it yielded
    pub fn page(&mut self, records: usize) {
        self.pages_fetched += 1;
        self.records_synced += records;
    }

    /// Count a stream that ran to completion
    pub fn finished(&mut self, elapsed: Duration) {
        self.streams_synced += 1;
        self.duration_ms += elapsed.as_millis() as u64;
    }

    pub fn failed(&mut self) {
        self.errors += 1;
    }

    pub fn merge(&mut self, other: &SyncStats) {
        self.records_synced += other.records_synced;
        self.pages_fetched += other.pages_fetched;
        self.streams_synced += other.streams_synced;
        self.errors += other.errors;
        self.duration_ms += other.duration_ms;
    }
}
