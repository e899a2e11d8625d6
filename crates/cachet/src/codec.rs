//! Value encoding between handler results and stored bytes.

use cachet_core::CacheResult;
use serde_json::Value;

/// Converts JSON values to and from the bytes a store holds.
///
/// Typed values pass through [`serde_json::Value`] first, so a codec only
/// has to deal with one shape.
pub trait Codec: Send + Sync {
    /// Encodes a value for storage.
    fn encode(&self, value: &Value) -> CacheResult<Vec<u8>>;

    /// Decodes stored bytes.
    fn decode(&self, bytes: &[u8]) -> CacheResult<Value>;

    /// Codec name for logs.
    fn name(&self) -> &'static str;
}

/// Compact JSON text. Readable with `redis-cli`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> CacheResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> CacheResult<Value> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Whether a value counts as "no result" for `none = false`.
///
/// Null and empty strings, arrays and objects count. Zero and `false` do not.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
