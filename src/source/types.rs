//! Source strategy trait and request context

use super::strategies::{GenericSource, MonthlyWindowSource, VolumeWindowSource};
use crate::error::Result;
use crate::pagination::{calendar, PageRequest, PageResponse, PageToken, PaginationState};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Wire format of the `period` query parameter
pub const PERIOD_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Wire format of day-granular window bounds
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Per-stream inputs a strategy needs to build a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Configured start date
    pub start_date: DateTime<Utc>,
    /// Bookmark from a previous run, if any
    pub checkpoint: Option<DateTime<Utc>>,
    /// Page size hint
    pub page_size: u32,
}

impl RequestContext {
    /// Create a context from the configured start date
    pub fn new(start_date: DateTime<Utc>, page_size: u32) -> Self {
        Self {
            start_date,
            checkpoint: None,
            page_size,
        }
    }

    /// Resume from a stored bookmark
    #[must_use]
    pub fn with_checkpoint(mut self, checkpoint: Option<DateTime<Utc>>) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    /// The bookmark if present, else the configured start date
    pub fn starting_timestamp(&self) -> DateTime<Utc> {
        self.checkpoint.unwrap_or(self.start_date)
    }
}

/// How far back the windowed sources may reach, in whole years before today.
/// `None` disables the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookbackPolicy {
    /// Floor for the volume-window source
    pub volume_years: Option<u32>,
    /// Floor for the monthly-window source
    pub monthly_years: Option<u32>,
}

impl Default for LookbackPolicy {
    fn default() -> Self {
        Self {
            volume_years: Some(2),
            monthly_years: None,
        }
    }
}

/// Clamp `start` to no earlier than `years` before `today`
pub(crate) fn apply_lookback(
    start: DateTime<Utc>,
    years: Option<u32>,
    today: NaiveDate,
) -> DateTime<Utc> {
    match years {
        Some(years) => start.max(calendar::midnight(calendar::years_before(today, years))),
        None => start,
    }
}

/// Which strategy a stream uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Generic,
    VolumeWindow,
    MonthlyWindow,
}

impl StrategyKind {
    /// Instantiate the strategy under the given lookback policy
    pub fn build(self, lookback: LookbackPolicy) -> Arc<dyn SourceStrategy> {
        match self {
            Self::Generic => Arc::new(GenericSource::new()),
            Self::VolumeWindow => Arc::new(VolumeWindowSource::new(lookback.volume_years)),
            Self::MonthlyWindow => Arc::new(MonthlyWindowSource::new(lookback.monthly_years)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "generic"),
            Self::VolumeWindow => write!(f, "volume_window"),
            Self::MonthlyWindow => write!(f, "monthly_window"),
        }
    }
}

/// Request-building and paging behavior of one family of streams.
///
/// `today` is passed in rather than read from the system clock so month
/// boundaries are deterministic under test.
pub trait SourceStrategy: Send + Sync + fmt::Debug {
    /// Which strategy this is
    fn kind(&self) -> StrategyKind;

    /// Parameters for the next request
    fn build_params(
        &self,
        ctx: &RequestContext,
        state: &PaginationState,
        today: NaiveDate,
    ) -> PageRequest;

    /// Token for the page after `page`, or `None` when the sequence ends
    fn next_token(
        &self,
        page: &PageResponse<'_>,
        state: &PaginationState,
        today: NaiveDate,
    ) -> Option<PageToken>;

    /// Adjust a raw record before validation
    fn post_process(&self, _stream: &str, record: Value) -> Result<Value> {
        Ok(record)
    }
}
