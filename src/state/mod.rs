//! Per-stream replication bookmarks
//!
//! `State` is the Singer document written between runs; `StateManager`
//! is the handle the stream drivers share while a run is in progress.
//! A bookmark only ever moves forward.

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{Bookmark, State};
