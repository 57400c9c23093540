//! # tap-segment
//!
//! Incremental extractor for Segment Public API usage metrics: daily API
//! calls per workspace and per source, daily event volume, and daily MTU
//! (monthly tracked users) breakdowns.
//!
//! Paging follows the `pagination.next` cursor (or the `X-Next-Page`
//! header). MTU endpoints stop handing out cursors at a month boundary, so
//! their source walks month by month up to the current one. Bookmarks only
//! move forward and are written in the Singer layout.
//!
//! ## Library use
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use tap_segment::config::TapConfig;
//! use tap_segment::connector::{Connector, ReadOptions, SegmentConnector};
//!
//! #[tokio::main]
//! async fn main() -> tap_segment::Result<()> {
//!     let config = TapConfig::from_json(r#"{"api_token": "..."}"#)?;
//!     let connector = SegmentConnector::new(config)?;
//!
//!     let mut messages = connector.read(ReadOptions::default()).await?;
//!     while let Some(msg) = messages.try_next().await? {
//!         println!("{}", serde_json::to_string(&msg)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Layout
//!
//! `streams` names the five Segment usage endpoints and picks a `source`
//! strategy for each. The `engine` drives one stream at a time: the source
//! builds the query, `http` fetches it, `decode` and `schema` turn the body
//! into conformed records, and `state` keeps the bookmarks. `connector` and
//! `cli` put the Singer commands on top.

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::doc_markdown
)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod connector;
pub mod decode;
pub mod engine;
pub mod error;
pub mod http;
pub mod pagination;
pub mod schema;
pub mod source;
pub mod state;
pub mod streams;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

pub use config::TapConfig;
pub use connector::{Connector, SegmentConnector};

/// Sent in the `User-Agent` header together with `NAME`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");
