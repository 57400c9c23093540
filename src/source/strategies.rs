//! Source strategy implementations

use super::types::{
    apply_lookback, RequestContext, SourceStrategy, StrategyKind, DAY_FORMAT, PERIOD_FORMAT,
};
use crate::error::Result;
use crate::pagination::{
    calendar, CursorLocator, PageRequest, PageResponse, PageToken, PaginationState, CURSOR_PARAM,
    PAGE_SIZE_PARAM,
};
use crate::schema::coerce_integer_fields;
use chrono::{Days, NaiveDate};
use serde_json::Value;
use tracing::debug;

/// Count fields the MTU endpoints return as strings
pub const MTU_COUNT_FIELDS: [&str; 4] = [
    "anonymous",
    "anonymousIdentified",
    "identified",
    "neverIdentified",
];

// ============================================================================
// Generic
// ============================================================================

/// Cursor pagination anchored at the starting timestamp
#[derive(Debug, Clone, Default)]
pub struct GenericSource {
    cursor: CursorLocator,
}

impl GenericSource {
    /// Create a generic source with the default cursor locator
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceStrategy for GenericSource {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Generic
    }

    fn build_params(
        &self,
        ctx: &RequestContext,
        state: &PaginationState,
        _today: NaiveDate,
    ) -> PageRequest {
        let start = ctx.starting_timestamp();
        PageRequest::new(Some(start))
            .param(PAGE_SIZE_PARAM, ctx.page_size.to_string())
            .param("period", start.format(PERIOD_FORMAT).to_string())
            .param_opt(
                CURSOR_PARAM,
                state.token.as_ref().and_then(PageToken::as_opaque),
            )
    }

    fn next_token(
        &self,
        page: &PageResponse<'_>,
        _state: &PaginationState,
        _today: NaiveDate,
    ) -> Option<PageToken> {
        self.cursor.extract(page).map(PageToken::Opaque)
    }
}

// ============================================================================
// Volume Window
// ============================================================================

/// Day-granular window from the starting timestamp to yesterday
#[derive(Debug, Clone)]
pub struct VolumeWindowSource {
    cursor: CursorLocator,
    lookback_years: Option<u32>,
}

impl VolumeWindowSource {
    /// Create a volume-window source with the given lookback horizon
    pub fn new(lookback_years: Option<u32>) -> Self {
        Self {
            cursor: CursorLocator::default(),
            lookback_years,
        }
    }
}

impl SourceStrategy for VolumeWindowSource {
    fn kind(&self) -> StrategyKind {
        StrategyKind::VolumeWindow
    }

    fn build_params(
        &self,
        ctx: &RequestContext,
        state: &PaginationState,
        today: NaiveDate,
    ) -> PageRequest {
        let start = apply_lookback(ctx.starting_timestamp(), self.lookback_years, today);
        let end = today.checked_sub_days(Days::new(1)).unwrap_or(today);

        PageRequest::new(Some(start))
            .param(PAGE_SIZE_PARAM, ctx.page_size.to_string())
            .param("granularity", "DAY")
            .param("startTime", start.format(DAY_FORMAT).to_string())
            .param("endTime", end.format(DAY_FORMAT).to_string())
            .param_opt(
                CURSOR_PARAM,
                state.token.as_ref().and_then(PageToken::as_opaque),
            )
    }

    fn next_token(
        &self,
        page: &PageResponse<'_>,
        _state: &PaginationState,
        _today: NaiveDate,
    ) -> Option<PageToken> {
        self.cursor.extract(page).map(PageToken::Opaque)
    }
}

// ============================================================================
// Monthly Window
// ============================================================================

/// Month-by-month walk from the starting timestamp through the current month
#[derive(Debug, Clone)]
pub struct MonthlyWindowSource {
    cursor: CursorLocator,
    lookback_years: Option<u32>,
}

impl MonthlyWindowSource {
    /// Create a monthly-window source with an optional lookback horizon
    pub fn new(lookback_years: Option<u32>) -> Self {
        Self {
            cursor: CursorLocator::default(),
            lookback_years,
        }
    }
}

impl SourceStrategy for MonthlyWindowSource {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MonthlyWindow
    }

    fn build_params(
        &self,
        ctx: &RequestContext,
        state: &PaginationState,
        today: NaiveDate,
    ) -> PageRequest {
        let initial = || apply_lookback(ctx.starting_timestamp(), self.lookback_years, today);

        let (period, cursor) = match &state.token {
            Some(PageToken::Month(month)) => (calendar::midnight(*month), None),
            // Cursor pages stay inside the window that produced the cursor
            Some(PageToken::Opaque(cursor)) => (
                state.last_period_sent.unwrap_or_else(initial),
                Some(cursor.as_str()),
            ),
            None => (initial(), None),
        };

        PageRequest::new(Some(period))
            .param(PAGE_SIZE_PARAM, ctx.page_size.to_string())
            .param("period", period.format(PERIOD_FORMAT).to_string())
            .param_opt(CURSOR_PARAM, cursor)
    }

    fn next_token(
        &self,
        page: &PageResponse<'_>,
        state: &PaginationState,
        today: NaiveDate,
    ) -> Option<PageToken> {
        if let Some(cursor) = self.cursor.extract(page) {
            return Some(PageToken::Opaque(cursor));
        }

        // The current month is fetched once; nothing after it is proposed
        let last = state.last_period_sent?.date_naive();
        let next = calendar::next_month_window(last, today)?;
        debug!(from = %last, to = %next, "advancing to next monthly window");
        Some(PageToken::Month(next))
    }

    fn post_process(&self, stream: &str, record: Value) -> Result<Value> {
        coerce_integer_fields(stream, record, &MTU_COUNT_FIELDS)
    }
}
