//! Parsing response bodies and locating values inside them
//!
//! Locators are JSONPath strings. A plain dotted path (with optional
//! `name[i]` segments, negative `i` counting from the end) is walked by
//! hand; anything with a wildcard goes through `jsonpath-rust`. A locator
//! that matches nothing yields no records or no token, never an error.

use crate::error::{Error, Result};
use jsonpath_rust::JsonPath;
use serde_json::Value;

/// Pulls a stream's records out of a response body
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    locator: String,
}

impl RecordExtractor {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
        }
    }

    /// A body that is not JSON is a `Decode` error
    pub fn parse(&self, body: &str) -> Result<Value> {
        serde_json::from_str(body).map_err(|e| Error::decode(format!("body is not JSON: {e}")))
    }

    /// Matched array elements. A single matched object counts as one
    /// record; `null` counts as none.
    pub fn records(&self, body: &Value) -> Result<Vec<Value>> {
        if self.locator.contains('*') {
            return query(body, &self.locator);
        }
        Ok(match walk(body, &self.locator) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other],
        })
    }
}

/// First non-null value `locator` selects
fn first_match(body: &Value, locator: &str) -> Option<Value> {
    if locator.contains('*') {
        query(body, locator).ok()?.into_iter().find(|v| !v.is_null())
    } else {
        walk(body, locator).filter(|v| !v.is_null())
    }
}

/// Scalar at `locator` rendered as text. Empty strings, objects and arrays
/// are treated as absent.
pub fn extract_jsonpath(body: &Value, locator: &str) -> Option<String> {
    match first_match(body, locator)? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn walk(body: &Value, locator: &str) -> Option<Value> {
    let trimmed = locator.trim_start_matches('$').trim_start_matches('.');
    if trimmed.is_empty() {
        return Some(body.clone());
    }

    let mut node = body;
    for segment in trimmed.split('.') {
        let Some((name, index)) = segment.split_once('[') else {
            node = node.get(segment)?;
            continue;
        };
        if !name.is_empty() {
            node = node.get(name)?;
        }
        let index: i64 = index.strip_suffix(']')?.parse().ok()?;
        let items = node.as_array()?;
        let position = if index < 0 {
            items.len().checked_sub(index.unsigned_abs() as usize)?
        } else {
            index as usize
        };
        node = items.get(position)?;
    }
    Some(node.clone())
}

fn query(body: &Value, locator: &str) -> Result<Vec<Value>> {
    let path = JsonPath::try_from(locator).map_err(|e| Error::JsonPath {
        path: locator.to_string(),
        message: e.to_string(),
    })?;

    // Branches that miss come back as nulls
    Ok(match path.find(body) {
        Value::Array(found) => found.into_iter().filter(|v| !v.is_null()).collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    })
}

#[cfg(test)]
mod tests;
