//! Page tokens and the per-stream page sequence
//!
//! Every stream walks the same loop: build a request from the current
//! [`PaginationState`], send it, then ask the stream's strategy for the next
//! [`PageToken`]. A token is either an opaque cursor taken from the response
//! or a calendar month synthesized by the client when the API stops handing
//! out cursors at a month boundary. `None` ends the sequence.

pub mod calendar;
mod types;

pub use types::{
    CursorLocator, PageRequest, PageResponse, PageToken, PaginationState, CURSOR_PARAM,
    NEXT_PAGE_HEADER, PAGE_SIZE_PARAM,
};
