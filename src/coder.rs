//! Encoding of serialized attributes.
//!
//! A serialized attribute is stored in encoded form, so a candidate value has
//! to go through the same encoder before it can be compared with stored rows.

use crate::core::{Result, Value};

pub trait AttributeCoder: Send + Sync {
    /// Encode a value into its stored form.
    fn dump(&self, value: &Value) -> Result<Value>;
}

/// Stores the value as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCoder;

impl AttributeCoder for JsonCoder {
    fn dump(&self, value: &Value) -> Result<Value> {
        let encoded = match value {
            // Text may already hold a JSON document; keep its structure.
            Value::Text(text) => match serde_json::from_str::<serde_json::Value>(text) {
                Ok(doc) => serde_json::to_string(&doc)?,
                Err(_) => serde_json::to_string(text)?,
            },
            other => serde_json::to_string(&other.to_json())?,
        };
        Ok(Value::Text(encoded))
    }
}
