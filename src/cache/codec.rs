//! Value Codec Module
//!
//! Turns a [`CacheValue`] into the string stored under a key and back.
//!
//! Values are first rendered to canonical JSON (sorted mapping keys, tagged
//! dates). Canonical forms above the compression threshold, or any value when
//! compression is forced, are gzip-compressed and stored as
//! `__compressed__<base64>`.

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use crate::cache::{CacheValue, COMPRESSION_MARKER, COMPRESSION_THRESHOLD};
use crate::error::{CacheError, Result};

// == Value Codec ==
/// Encodes and decodes stored payloads.
#[derive(Debug, Clone, Copy)]
pub struct ValueCodec {
    /// Canonical size in bytes above which payloads are compressed
    compression_threshold: usize,
}

impl Default for ValueCodec {
    fn default() -> Self {
        Self::new(COMPRESSION_THRESHOLD)
    }
}

impl ValueCodec {
    // == Constructor ==
    pub fn new(compression_threshold: usize) -> Self {
        Self {
            compression_threshold,
        }
    }

    // == Encode ==
    /// Encodes a value for storage.
    ///
    /// `None` is rejected: an absent value cannot be cached, callers delete
    /// the key instead. Values `decode` could not read back (dates past year
    /// 9999) fail with `Serialization` too.
    pub fn encode(&self, value: Option<&CacheValue>, force_compress: bool) -> Result<String> {
        let value = value.ok_or_else(|| {
            CacheError::Serialization("cannot cache an absent value".to_string())
        })?;
        value.check_encodable()?;

        let canonical = serde_json::to_string(&value.to_json())
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        if !force_compress && canonical.len() <= self.compression_threshold {
            return Ok(canonical);
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(canonical.as_bytes())
            .map_err(|e| CacheError::Serialization(format!("compression failed: {}", e)))?;
        let compressed = encoder
            .finish()
            .map_err(|e| CacheError::Serialization(format!("compression failed: {}", e)))?;

        Ok(format!("{}{}", COMPRESSION_MARKER, STANDARD.encode(compressed)))
    }

    // == Decode ==
    /// Decodes a stored payload.
    ///
    /// An empty payload is a miss (`Ok(None)`), not corruption. Any failure to
    /// decompress or parse is a `Deserialization` error.
    pub fn decode(&self, payload: &str) -> Result<Option<CacheValue>> {
        if payload.is_empty() {
            return Ok(None);
        }

        let canonical = match payload.strip_prefix(COMPRESSION_MARKER) {
            Some(body) => decompress(body)?,
            None => payload.to_string(),
        };

        let json: serde_json::Value = serde_json::from_str(&canonical)
            .map_err(|e| CacheError::Deserialization(format!("invalid payload: {}", e)))?;

        CacheValue::from_json(json).map(Some)
    }
}

fn decompress(body: &str) -> Result<String> {
    let compressed = STANDARD
        .decode(body)
        .map_err(|e| CacheError::Deserialization(format!("invalid base64: {}", e)))?;

    let mut canonical = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut canonical)
        .map_err(|e| CacheError::Deserialization(format!("decompression failed: {}", e)))?;
    Ok(canonical)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn nested_value() -> CacheValue {
        let when = Utc.with_ymd_and_hms(2023, 11, 5, 8, 30, 0).unwrap();
        CacheValue::mapping([
            ("id", CacheValue::from(7i64)),
            ("score", CacheValue::float(98.25).unwrap()),
            ("ran_at", CacheValue::Date(when)),
            (
                "runs",
                CacheValue::Sequence(vec![
                    CacheValue::mapping([("at", CacheValue::Date(when)), ("ok", true.into())]),
                    CacheValue::Null,
                ]),
            ),
        ])
    }

    #[test]
    fn test_small_value_is_plain_json() {
        let codec = ValueCodec::default();
        let encoded = codec
            .encode(Some(&CacheValue::mapping([("value", CacheValue::from(42i64))])), false)
            .unwrap();
        assert_eq!(encoded, r#"{"value":42}"#);
    }

    #[test]
    fn test_round_trip_nested() {
        let codec = ValueCodec::default();
        let value = nested_value();
        let encoded = codec.encode(Some(&value), false).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), Some(value));
    }

    #[test]
    fn test_large_value_is_compressed() {
        let codec = ValueCodec::default();
        let value = CacheValue::from("x".repeat(COMPRESSION_THRESHOLD * 2));
        let encoded = codec.encode(Some(&value), false).unwrap();

        assert!(encoded.starts_with(COMPRESSION_MARKER));
        assert!(encoded.len() < COMPRESSION_THRESHOLD);
        assert_eq!(codec.decode(&encoded).unwrap(), Some(value));
    }

    #[test]
    fn test_threshold_is_inclusive_upper_bound_for_plain() {
        let codec = ValueCodec::new(10);
        // `"12345678"` is exactly 10 bytes of JSON
        let at_limit = codec.encode(Some(&CacheValue::from("12345678")), false).unwrap();
        let over_limit = codec.encode(Some(&CacheValue::from("123456789")), false).unwrap();
        assert!(!at_limit.starts_with(COMPRESSION_MARKER));
        assert!(over_limit.starts_with(COMPRESSION_MARKER));
    }

    #[test]
    fn test_force_compress() {
        let codec = ValueCodec::default();
        let value = CacheValue::from(1i64);
        let encoded = codec.encode(Some(&value), true).unwrap();
        assert!(encoded.starts_with(COMPRESSION_MARKER));
        assert_eq!(codec.decode(&encoded).unwrap(), Some(value));
    }

    #[test]
    fn test_absent_value_fails() {
        let codec = ValueCodec::default();
        assert!(matches!(
            codec.encode(None, false),
            Err(CacheError::Serialization(_))
        ));
    }

    #[test]
    fn test_date_shaped_mapping_round_trips() {
        let codec = ValueCodec::default();
        let value = CacheValue::mapping([
            ("__type", CacheValue::from("Date")),
            ("value", CacheValue::from("2024-01-01T00:00:00Z")),
        ]);
        let encoded = codec.encode(Some(&value), false).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), Some(value));
    }

    #[test]
    fn test_unreadable_date_is_rejected_on_encode() {
        let codec = ValueCodec::default();
        let far = Utc.with_ymd_and_hms(12_000, 6, 1, 0, 0, 0).unwrap();
        let result = codec.encode(Some(&CacheValue::mapping([("at", CacheValue::Date(far))])), false);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_null_is_encodable() {
        let codec = ValueCodec::default();
        let encoded = codec.encode(Some(&CacheValue::Null), false).unwrap();
        assert_eq!(encoded, "null");
        assert_eq!(codec.decode(&encoded).unwrap(), Some(CacheValue::Null));
    }

    #[test]
    fn test_empty_payload_is_miss() {
        assert_eq!(ValueCodec::default().decode("").unwrap(), None);
    }

    #[test]
    fn test_malformed_json_fails() {
        let result = ValueCodec::default().decode("{not json");
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }

    #[test]
    fn test_bad_base64_fails() {
        let result = ValueCodec::default().decode("__compressed__!!!");
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }

    #[test]
    fn test_non_gzip_body_fails() {
        let payload = format!("{}{}", COMPRESSION_MARKER, STANDARD.encode(b"plain bytes"));
        let result = ValueCodec::default().decode(&payload);
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }

    #[test]
    fn test_canonical_form_sorts_keys() {
        let codec = ValueCodec::default();
        let value = CacheValue::mapping([("b", CacheValue::from(1i64)), ("a", CacheValue::from(2i64))]);
        assert_eq!(codec.encode(Some(&value), false).unwrap(), r#"{"a":2,"b":1}"#);
    }
}
