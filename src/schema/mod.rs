//! Stream schema module
//!
//! Declares the shape of each stream's output records and enforces it.
//!
//! # Features
//!
//! - **Declared Types**: string, integer, number and timestamp fields
//! - **JSON Schema Export**: Singer-compatible schema for `discover`
//! - **Conformance**: drops undeclared fields, type-checks the rest
//! - **Coercion**: string-to-integer conversion for count fields

mod coerce;
mod types;

pub use coerce::{coerce_integer_fields, conform, parse_timestamp};
pub use types::{Field, FieldType, StreamSchema};
