//! Source strategies
//!
//! A stream's source strategy decides three things: which query parameters
//! the next request carries, how the next page token is derived from a
//! response, and how each raw record is adjusted before validation.
//!
//! - [`GenericSource`]: cursor pagination anchored at the starting timestamp
//! - [`VolumeWindowSource`]: a day-granular `[startTime, endTime]` window
//!   bounded by a lookback horizon
//! - [`MonthlyWindowSource`]: month-by-month walk up to the current month,
//!   following cursors inside a month and synthesizing the next month when
//!   the API stops returning them

mod strategies;
mod types;

pub use strategies::{
    GenericSource, MonthlyWindowSource, VolumeWindowSource, MTU_COUNT_FIELDS,
};
pub use types::{LookbackPolicy, RequestContext, SourceStrategy, StrategyKind};

#[cfg(test)]
mod tests;
