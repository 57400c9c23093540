//! Schema types

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Semantic type of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    /// RFC 3339 date-time carried as a string
    Timestamp,
}

impl FieldType {
    /// JSON Schema fragment for this type (always nullable)
    pub fn json_schema(self) -> Value {
        match self {
            FieldType::String => json!({"type": ["string", "null"]}),
            FieldType::Integer => json!({"type": ["integer", "null"]}),
            FieldType::Number => json!({"type": ["number", "null"]}),
            FieldType::Timestamp => json!({"type": ["string", "null"], "format": "date-time"}),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Number => write!(f, "number"),
            FieldType::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// A named, typed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub field_type: FieldType,
}

/// Ordered field declarations for one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSchema {
    fields: Vec<Field>,
}

impl StreamSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field declaration
    #[must_use]
    pub fn field(mut self, name: &'static str, field_type: FieldType) -> Self {
        self.fields.push(Field { name, field_type });
        self
    }

    /// Declared fields, in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field's type
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.field_type)
    }

    /// Check whether a field is declared
    pub fn contains(&self, name: &str) -> bool {
        self.field_type(name).is_some()
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.field_type.json_schema()))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
        })
    }
}
