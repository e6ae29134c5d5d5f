//! Record ⇄ text conversion.
//!
//! The engine never assumes a concrete format. Anything that implements [`Codec`] with a
//! deterministic `encode` (same map, same text) can back the store. [`JsonCodec`] is the
//! one shipped with the crate.

use crate::error::{Result, VaultError};
use crate::model::FieldMap;

pub trait Codec: Send + Sync {
    /// Serialize a profile body. Must be deterministic.
    fn encode(&self, data: &FieldMap) -> Result<String>;

    /// Parse a profile body. Fails with [`VaultError::Decode`] on malformed text.
    fn decode(&self, text: &str) -> Result<FieldMap>;

    /// File extension (without the dot) for profile and backup files.
    fn extension(&self) -> &str;
}

/// Pretty-printed JSON, keys in stable order.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, data: &FieldMap) -> Result<String> {
        serde_json::to_string_pretty(data).map_err(VaultError::Serialization)
    }

    fn decode(&self, text: &str) -> Result<FieldMap> {
        if text.trim().is_empty() {
            return Err(VaultError::Decode("empty document".to_string()));
        }
        serde_json::from_str(text).map_err(|e| VaultError::Decode(e.to_string()))
    }

    fn extension(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldValue, ProfileSchema};

    #[test]
    fn encode_is_deterministic() {
        let data = FieldMap::defaults(&ProfileSchema);
        let a = JsonCodec.encode(&data).unwrap();
        let b = JsonCodec.encode(&data.clone()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn decode_restores_encoded_defaults() {
        let data = FieldMap::defaults(&ProfileSchema);
        let text = JsonCodec.encode(&data).unwrap();
        assert_eq!(JsonCodec.decode(&text).unwrap(), data);
    }

    #[test]
    fn decode_rejects_empty_and_whitespace() {
        assert!(matches!(JsonCodec.decode(""), Err(VaultError::Decode(_))));
        assert!(matches!(JsonCodec.decode("  \n\t"), Err(VaultError::Decode(_))));
    }

    #[test]
    fn decode_rejects_truncated_documents() {
        let text = JsonCodec.encode(&FieldMap::defaults(&ProfileSchema)).unwrap();
        let truncated = &text[..text.len() / 2];
        assert!(matches!(JsonCodec.decode(truncated), Err(VaultError::Decode(_))));
    }

    #[test]
    fn decode_rejects_non_object_documents() {
        assert!(JsonCodec.decode("[1, 2, 3]").is_err());
        assert!(JsonCodec.decode("\"just a string\"").is_err());
    }

    #[test]
    fn decode_keeps_malformed_values_for_the_validator() {
        let data = JsonCodec
            .decode(r#"{"fontSize": "huge", "fillOpacity": null}"#)
            .unwrap();
        assert_eq!(data.get("fontSize"), Some(&FieldValue::text("huge")));
        assert!(matches!(data.get("fillOpacity"), Some(FieldValue::Other(_))));
    }

    #[test]
    fn extension_is_json() {
        assert_eq!(JsonCodec.extension(), "json");
    }
}
