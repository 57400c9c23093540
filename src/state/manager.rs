//! Shared bookmark store, optionally backed by a JSON file

use super::types::{Bookmark, State};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Clones share one set of bookmarks, so every stream driver of a run
/// advances the same document.
#[derive(Debug, Clone, Default)]
pub struct StateManager {
    /// `None` keeps bookmarks in memory only
    file: Option<PathBuf>,
    bookmarks: Arc<RwLock<State>>,
}

impl StateManager {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_state(state: State) -> Self {
        Self {
            file: None,
            bookmarks: Arc::new(RwLock::new(state)),
        }
    }

    /// A file that does not exist yet starts out empty and is created on
    /// the first `persist`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let state = match std::fs::read_to_string(path) {
            Ok(contents) => parse_state(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => State::default(),
            Err(e) => return Err(Error::state(format!("cannot read {}: {e}", path.display()))),
        };

        Ok(Self {
            file: Some(path.to_path_buf()),
            bookmarks: Arc::new(RwLock::new(state)),
        })
    }

    /// Blank input means no bookmarks
    pub fn from_json(json: &str) -> Result<Self> {
        parse_state(json).map(Self::with_state)
    }

    pub async fn bookmark(&self, stream: &str) -> Option<Bookmark> {
        self.bookmarks.read().await.bookmark(stream).cloned()
    }

    pub async fn checkpoint_for(&self, stream: &str) -> Result<Option<DateTime<Utc>>> {
        self.bookmarks.read().await.checkpoint(stream)
    }

    /// Forward-only; returns whether the bookmark moved
    pub async fn advance(&self, stream: &str, replication_key: &str, value: DateTime<Utc>) -> bool {
        self.bookmarks
            .write()
            .await
            .advance(stream, replication_key, value)
    }

    pub async fn snapshot(&self) -> State {
        self.bookmarks.read().await.clone()
    }

    /// Write the bookmarks to the backing file, if any, and return what
    /// was written. The file is replaced through a rename so a crash never
    /// leaves it half written.
    pub async fn persist(&self) -> Result<State> {
        let state = self.snapshot().await;
        let Some(path) = &self.file else {
            return Ok(state);
        };

        let contents = serde_json::to_string_pretty(&state)?;
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, contents)
            .await
            .map_err(|e| Error::state(format!("cannot write {}: {e}", staging.display())))?;
        tokio::fs::rename(&staging, path)
            .await
            .map_err(|e| Error::state(format!("cannot replace {}: {e}", path.display())))?;

        debug!(path = %path.display(), streams = state.bookmarks.len(), "bookmarks saved");
        Ok(state)
    }
}

fn parse_state(json: &str) -> Result<State> {
    if json.trim().is_empty() {
        return Ok(State::default());
    }
    serde_json::from_str(json).map_err(|e| Error::state(format!("not a bookmarks document: {e}")))
}
