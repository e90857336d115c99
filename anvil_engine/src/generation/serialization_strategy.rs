use serde::{de::DeserializeOwned, Serialize};

use crate::prelude::*;

/// The wire format used to talk to the generation service. Swapping the
/// strategy changes the request body, the `Content-Type` header and how
/// responses are decoded, without touching the transport.
pub trait SerializationStrategy: Send + Sync {
    fn content_type(&self) -> &'static str;
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerialization;

impl SerializationStrategy for JsonSerialization {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).context("Could not encode value as JSON")
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).with_context(|| {
            format!(
                "Could not parse JSON: {}",
                String::from_utf8_lossy(&bytes[..bytes.len().min(256)])
            )
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RonSerialization;

impl SerializationStrategy for RonSerialization {
    fn content_type(&self) -> &'static str {
        "application/ron"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let text = ron::ser::to_string(&value).context("Could not encode value as RON")?;
        Ok(text.into_bytes())
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        ron::de::from_bytes(bytes).context("Could not parse RON")
    }
}
