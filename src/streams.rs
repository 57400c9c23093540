//! Stream registry
//!
//! The fixed set of Segment endpoints this tap extracts, each paired with
//! its output schema and source strategy.

use crate::error::{Error, Result};
use crate::schema::{FieldType, StreamSchema};
use crate::source::{LookbackPolicy, SourceStrategy, StrategyKind};
use crate::types::ReplicationMethod;
use serde_json::{json, Value};
use std::sync::{Arc, LazyLock};

/// Static description of one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDefinition {
    /// Stream name
    pub name: &'static str,
    /// Endpoint path relative to the base URL
    pub path: &'static str,
    /// Fields identifying a record
    pub primary_keys: &'static [&'static str],
    /// Field the checkpoint is taken from
    pub replication_key: &'static str,
    /// Path expression selecting the records array
    pub records_locator: &'static str,
    /// Request-building behavior
    pub strategy: StrategyKind,
    /// Output schema
    pub schema: StreamSchema,
}

impl StreamDefinition {
    /// Replication method; every Segment stream is incremental
    pub fn replication_method(&self) -> ReplicationMethod {
        ReplicationMethod::Incremental
    }

    /// Singer catalog entry
    pub fn catalog_entry(&self) -> Value {
        json!({
            "tap_stream_id": self.name,
            "stream": self.name,
            "key_properties": self.primary_keys,
            "replication_key": self.replication_key,
            "replication_method": self.replication_method(),
            "schema": self.schema.to_json_schema(),
            "metadata": [{
                "breadcrumb": [],
                "metadata": {
                    "inclusion": "available",
                    "selected": true,
                    "table-key-properties": self.primary_keys,
                    "valid-replication-keys": [self.replication_key],
                    "forced-replication-method": self.replication_method(),
                }
            }],
        })
    }

    /// Pair this definition with its strategy under `lookback`
    pub fn instantiate(&self, lookback: LookbackPolicy) -> SegmentStream {
        SegmentStream {
            definition: self.clone(),
            strategy: self.strategy.build(lookback),
        }
    }
}

/// A stream ready to sync
#[derive(Debug, Clone)]
pub struct SegmentStream {
    pub definition: StreamDefinition,
    pub strategy: Arc<dyn SourceStrategy>,
}

impl SegmentStream {
    /// Stream name
    pub fn name(&self) -> &'static str {
        self.definition.name
    }
}

// ============================================================================
// Registry
// ============================================================================

fn mtu_schema(with_source: bool) -> StreamSchema {
    let schema = if with_source {
        StreamSchema::new().field("sourceId", FieldType::String)
    } else {
        StreamSchema::new()
    };

    schema
        .field("periodStart", FieldType::Number)
        .field("periodEnd", FieldType::Number)
        .field("anonymous", FieldType::Integer)
        .field("anonymousIdentified", FieldType::Integer)
        .field("identified", FieldType::Integer)
        .field("neverIdentified", FieldType::Integer)
        .field("timestamp", FieldType::Timestamp)
}

fn build_registry() -> Vec<StreamDefinition> {
    vec![
        StreamDefinition {
            name: "source_api_calls_daily",
            path: "/usage/api-calls/sources/daily",
            primary_keys: &["sourceId", "timestamp"],
            replication_key: "timestamp",
            records_locator: "$.dailyPerSourceAPICallsUsage[*]",
            strategy: StrategyKind::Generic,
            schema: StreamSchema::new()
                .field("sourceId", FieldType::String)
                .field("timestamp", FieldType::Timestamp)
                .field("apiCalls", FieldType::Integer),
        },
        StreamDefinition {
            name: "workspace_api_calls_daily",
            path: "/usage/api-calls/daily",
            primary_keys: &["timestamp"],
            replication_key: "timestamp",
            records_locator: "$.dailyWorkspaceAPICallsUsage[*]",
            strategy: StrategyKind::Generic,
            schema: StreamSchema::new()
                .field("timestamp", FieldType::Timestamp)
                .field("apiCalls", FieldType::Integer),
        },
        StreamDefinition {
            name: "events_volume_daily",
            path: "/events/volume",
            primary_keys: &["time"],
            replication_key: "time",
            records_locator: "$.data.result[0].series[*]",
            strategy: StrategyKind::VolumeWindow,
            schema: StreamSchema::new()
                .field("time", FieldType::Timestamp)
                .field("count", FieldType::Integer),
        },
        StreamDefinition {
            name: "source_mtu_usage_daily",
            path: "/usage/mtu/sources/daily",
            primary_keys: &["timestamp"],
            replication_key: "timestamp",
            records_locator: "$.data.dailyPerSourceMTUUsage[*]",
            strategy: StrategyKind::MonthlyWindow,
            schema: mtu_schema(true),
        },
        StreamDefinition {
            name: "workspace_mtu_usage_daily",
            path: "/usage/mtu/daily",
            primary_keys: &["timestamp"],
            replication_key: "timestamp",
            records_locator: "$.data.dailyWorkspaceMTUUsage[*]",
            strategy: StrategyKind::MonthlyWindow,
            schema: mtu_schema(false),
        },
    ]
}

/// All streams, in sync order
pub fn registry() -> &'static [StreamDefinition] {
    &REGISTRY
}

static REGISTRY: LazyLock<Vec<StreamDefinition>> = LazyLock::new(build_registry);

/// Look up a stream by name
pub fn find(name: &str) -> Result<&'static StreamDefinition> {
    registry()
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| Error::StreamNotFound {
            stream: name.to_string(),
        })
}

/// Resolve a comma-separated selection; `None` or an empty filter selects
/// every stream. Registry order is kept and duplicates collapse.
pub fn select(filter: Option<&str>) -> Result<Vec<&'static StreamDefinition>> {
    let names: Vec<&str> = filter
        .map(|f| {
            f.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if names.is_empty() {
        return Ok(registry().iter().collect());
    }

    for name in &names {
        find(name)?;
    }

    Ok(registry()
        .iter()
        .filter(|s| names.contains(&s.name))
        .collect())
}

/// Singer catalog for every stream
pub fn catalog() -> Value {
    let streams: Vec<Value> = registry()
        .iter()
        .map(StreamDefinition::catalog_entry)
        .collect();
    json!({ "streams": streams })
}
