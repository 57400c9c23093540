use crate::decode::extract_jsonpath;
use crate::types::QueryParams;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::fmt;

/// Page size hint, sent on every request
pub const PAGE_SIZE_PARAM: &str = "pagination.count";

pub const CURSOR_PARAM: &str = "pagination.cursor";

/// Consulted when the body carries no cursor
pub const NEXT_PAGE_HEADER: &str = "X-Next-Page";

/// How the next request differs from the previous one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageToken {
    /// Cursor from the response, sent back unchanged
    Opaque(String),
    /// Start of the next monthly window, computed by the tap
    Month(NaiveDate),
}

impl PageToken {
    pub fn as_opaque(&self) -> Option<&str> {
        match self {
            Self::Opaque(cursor) => Some(cursor),
            Self::Month(_) => None,
        }
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opaque(cursor) => write!(f, "cursor:{cursor}"),
            Self::Month(date) => write!(f, "month:{date}"),
        }
    }
}

/// Where one stream is in its page sequence. Carried from page to page
/// so nothing has to be recovered from the previous URL.
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// `period` of the latest request that sent one
    pub last_period_sent: Option<DateTime<Utc>>,
    /// `None` before the first request
    pub token: Option<PageToken>,
    pub pages: usize,
    /// Set once a strategy returns no token
    pub done: bool,
}

impl PaginationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A request without a period keeps the previous one
    pub fn record_request(&mut self, period: Option<DateTime<Utc>>) {
        if period.is_some() {
            self.last_period_sent = period;
        }
        self.pages += 1;
    }

    pub fn advance(&mut self, next: Option<PageToken>) {
        self.done = next.is_none();
        self.token = next;
    }
}

/// Query for one page plus the window it covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub params: QueryParams,
    pub period: Option<DateTime<Utc>>,
}

impl PageRequest {
    pub fn new(period: Option<DateTime<Utc>>) -> Self {
        Self {
            params: QueryParams::new(),
            period,
        }
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Skipped when `value` is `None`
    #[must_use]
    pub fn param_opt(self, key: impl Into<String>, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }
}

/// Parsed body and headers of a received page
#[derive(Debug, Clone, Copy)]
pub struct PageResponse<'a> {
    pub body: &'a Value,
    pub headers: &'a HeaderMap,
}

impl<'a> PageResponse<'a> {
    pub fn new(body: &'a Value, headers: &'a HeaderMap) -> Self {
        Self { body, headers }
    }
}

/// Body path first, then header. Segment puts the cursor at
/// `data.pagination.next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorLocator {
    pub body_path: Option<String>,
    pub header: Option<String>,
}

impl Default for CursorLocator {
    fn default() -> Self {
        Self {
            body_path: Some("$.data.pagination.next".to_string()),
            header: Some(NEXT_PAGE_HEADER.to_string()),
        }
    }
}

impl CursorLocator {
    /// Blank values count as no cursor
    pub fn extract(&self, page: &PageResponse<'_>) -> Option<String> {
        let from_body = self
            .body_path
            .as_deref()
            .and_then(|path| extract_jsonpath(page.body, path));

        from_body.or_else(|| {
            let value = page.headers.get(self.header.as_deref()?)?;
            let value = value.to_str().ok()?.trim();
            (!value.is_empty()).then(|| value.to_string())
        })
    }
}
