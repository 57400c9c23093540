//! The Singer bookmarks document

use crate::error::{Error, Result};
use crate::schema::parse_timestamp;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `{"bookmarks": {"<stream>": Bookmark}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Bookmark>,
}

impl State {
    pub fn bookmark(&self, stream: &str) -> Option<&Bookmark> {
        self.bookmarks.get(stream)
    }

    /// Parsed checkpoint for a stream, if one was stored
    pub fn checkpoint(&self, stream: &str) -> Result<Option<DateTime<Utc>>> {
        self.bookmark(stream).map(Bookmark::timestamp).transpose()
    }

    /// Move a stream's checkpoint to `value` if that is later than the
    /// stored one. Returns whether the bookmark changed.
    pub fn advance(&mut self, stream: &str, replication_key: &str, value: DateTime<Utc>) -> bool {
        if let Some(existing) = self.bookmarks.get(stream) {
            if existing.timestamp().is_ok_and(|current| current >= value) {
                return false;
            }
        }

        self.bookmarks
            .insert(stream.to_string(), Bookmark::new(replication_key, value));
        true
    }
}

/// Checkpoint of a single stream. The value is kept as text so a
/// hand-edited file with a plain date still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Field the checkpoint was taken from
    pub replication_key: String,
    /// Highest value seen, RFC 3339
    pub replication_key_value: String,
}

impl Bookmark {
    /// Stored as whole seconds with a `Z` suffix
    pub fn new(replication_key: impl Into<String>, value: DateTime<Utc>) -> Self {
        Self {
            replication_key: replication_key.into(),
            replication_key_value: value.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn timestamp(&self) -> Result<DateTime<Utc>> {
        parse_timestamp(&self.replication_key_value).ok_or_else(|| {
            Error::state(format!(
                "bookmark value '{}' is not a date",
                self.replication_key_value
            ))
        })
    }
}
