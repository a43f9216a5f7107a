//! Remote cache payload encoding.
//!
//! Batches are stored as `gz:` followed by base64 of gzip-compressed JSON.
//! Payloads without the prefix are read as plain JSON, which is how older
//! writers stored them.

use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;

use crate::domain::places::CachedBatch;

/// Prefix marking a compressed payload.
pub const COMPRESSED_PREFIX: &str = "gz:";

/// Upper bound on the size of a decompressed payload.
pub const MAX_DECOMPRESSED_BYTES: u64 = 32 * 1024 * 1024;

/// Failure to encode or decode a payload.
#[derive(Debug, Error)]
pub enum PayloadCodecError {
    /// JSON (de)serialisation failed.
    #[error("payload json invalid: {0}")]
    Json(#[from] serde_json::Error),
    /// Compression or decompression failed.
    #[error("payload compression failed: {0}")]
    Compression(#[from] std::io::Error),
    /// The base64 body was malformed.
    #[error("payload base64 invalid: {0}")]
    Base64(#[from] base64::DecodeError),
    /// Decompressed data exceeded [`MAX_DECOMPRESSED_BYTES`].
    #[error("payload exceeds {MAX_DECOMPRESSED_BYTES} bytes when decompressed")]
    TooLarge,
}

/// Encode a batch in the compressed format.
///
/// # Errors
/// Returns an error if serialisation or compression fails.
pub fn encode(batch: &CachedBatch) -> Result<String, PayloadCodecError> {
    let json = serde_json::to_vec(batch)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    Ok(format!("{COMPRESSED_PREFIX}{}", STANDARD.encode(compressed)))
}

/// Decode a payload in either format.
///
/// # Errors
/// Returns an error for malformed base64, gzip or JSON, or when the
/// decompressed body is larger than [`MAX_DECOMPRESSED_BYTES`].
pub fn decode(payload: &str) -> Result<CachedBatch, PayloadCodecError> {
    let Some(body) = payload.strip_prefix(COMPRESSED_PREFIX) else {
        return Ok(serde_json::from_str(payload)?);
    };
    let compressed = STANDARD.decode(body.trim())?;
    let mut json = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .take(MAX_DECOMPRESSED_BYTES + 1)
        .read_to_end(&mut json)?;
    if u64::try_from(json.len()).unwrap_or(u64::MAX) > MAX_DECOMPRESSED_BYTES {
        return Err(PayloadCodecError::TooLarge);
    }
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    //! Tests for payload prefixes and decode failures.
    use chrono::DateTime;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::geo::Coordinate;
    use crate::domain::places::{ElementKind, RawElement};

    #[fixture]
    fn batch() -> CachedBatch {
        let mut spa = RawElement::new(ElementKind::Node, 1);
        spa.point = Some(Coordinate::new(35.361, 138.731));
        spa.tags.insert("leisure".to_owned(), "spa".to_owned());
        CachedBatch {
            elements: vec![spa, RawElement::new(ElementKind::Relation, 2)],
            fetched_at: DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp"),
        }
    }

    #[rstest]
    fn compressed_payloads_carry_the_prefix(batch: CachedBatch) {
        let payload = encode(&batch).expect("encode");
        assert!(payload.starts_with(COMPRESSED_PREFIX));
        assert_eq!(decode(&payload).expect("decode"), batch);
    }

    #[rstest]
    fn plain_json_payloads_are_accepted(batch: CachedBatch) {
        let legacy = serde_json::to_string(&batch).expect("json");
        assert_eq!(decode(&legacy).expect("decode legacy"), batch);
    }

    #[rstest]
    #[case("gz:!!!not-base64!!!")]
    #[case("gz:aGVsbG8=")]
    #[case("{\"elements\": 3}")]
    #[case("")]
    fn malformed_payloads_fail(#[case] payload: &str) {
        assert!(decode(payload).is_err());
    }

    #[test]
    fn compressed_garbage_json_is_a_json_error() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"not json").expect("write");
        let compressed = encoder.finish().expect("finish");
        let payload = format!("{COMPRESSED_PREFIX}{}", STANDARD.encode(compressed));
        assert!(matches!(decode(&payload), Err(PayloadCodecError::Json(_))));
    }
}
