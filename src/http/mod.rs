//! Transport to the Segment Public API
//!
//! Every request the tap makes is a GET of `base_url + path` carrying the
//! stream's query parameters and a bearer token. Throttled (429) and
//! gateway (5xx) answers are retried with backoff before an error reaches
//! the engine.

mod client;
mod rate_limit;

pub use client::{ApiResponse, HttpClient, HttpClientConfig};
pub use rate_limit::RateLimiter;
