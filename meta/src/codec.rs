use std::fmt;

use serde_json::Value;

/// Turns raw request bytes into a JSON document.
pub trait JsonCodec: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<Value, serde_json::Error>;
}

impl fmt::Debug for dyn JsonCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonCodec")
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeJson;

impl JsonCodec for SerdeJson {
    fn parse(&self, bytes: &[u8]) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
