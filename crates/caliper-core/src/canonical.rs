//! # Canonical Serialization — Signature Input Production
//!
//! Defines `CanonicalBytes`, the sole construction path for bytes fed into
//! signature and digest computation.
//!
//! ## Security Invariant
//!
//! Every stored audit signature is recomputed later by the integrity
//! verifier. If the bytes signed at append time and the bytes hashed at
//! verification time could come from different serialization paths, a benign
//! formatting difference would be indistinguishable from tampering. The
//! `CanonicalBytes` newtype has a private inner field; the only constructor
//! applies float rejection and then RFC 8785 (JCS) serialization, so every
//! signature input in the system is produced by the same pipeline.
//!
//! ## Rules
//!
//! 1. **Reject floats** — confidence scores, counts, and sequence numbers
//!    are integers. Floats have non-deterministic canonical-number edge
//!    cases and never appear in signed payloads.
//! 2. **Object keys sorted, compact separators** — via `serde_jcs`.
//! 3. **Timestamps are strings** — the `Timestamp` type serializes as UTC
//!    ISO8601 with Z suffix at seconds precision, so the same instant always
//!    canonicalizes to the same bytes.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - No float appears anywhere in the value tree.
/// - Serialization is RFC 8785: sorted keys, compact separators, UTF-8.
///
/// Downstream code cannot violate these because the inner `Vec<u8>` is
/// private.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// This is the ONLY way to produce `CanonicalBytes`. All signature and
    /// digest computation in the workspace flows through here.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains
    /// a non-integer number, or `SerializationFailed` if JCS serialization
    /// fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for signature or digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Walk a JSON value tree and reject any number not representable as an
/// integer. Signed payloads carry only integers, strings, booleans, and
/// nulls; a float here means a caller put the wrong type in a record field.
fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Object(map) => {
            for v in map.values() {
                reject_floats(v)?;
            }
            Ok(())
        }
        Value::Array(arr) => {
            for v in arr {
                reject_floats(v)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_keys_compact_output() {
        let data = serde_json::json!({"reason": "qualified", "actor": "a-1", "flag": true});
        let cb = CanonicalBytes::new(&data).expect("should canonicalize");
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"actor":"a-1","flag":true,"reason":"qualified"}"#);
    }

    #[test]
    fn test_nested_objects_sorted() {
        let data = serde_json::json!({
            "new_state": {"is_final": true, "confidence": 8},
            "event": "decision_created"
        });
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(
            s,
            r#"{"event":"decision_created","new_state":{"confidence":8,"is_final":true}}"#
        );
    }

    #[test]
    fn test_float_rejected() {
        let data = serde_json::json!({"confidence": 7.5});
        match CanonicalBytes::new(&data) {
            Err(CanonicalizationError::FloatRejected(f)) => assert_eq!(f, 7.5),
            other => panic!("expected FloatRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_deeply_nested_float_rejected() {
        let data = serde_json::json!({"a": [{"b": {"c": 0.25}}]});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn test_integers_and_null_pass() {
        let data = serde_json::json!({"seq": 42, "ip": null, "count": -1});
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"count":-1,"ip":null,"seq":42}"#);
    }

    #[test]
    fn test_empty_object() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(cb.as_bytes(), b"{}");
        assert!(!cb.is_empty());
        assert_eq!(cb.len(), 2);
    }

    #[test]
    fn test_unicode_passes_through_as_utf8() {
        let data = serde_json::json!({"name": "Renée"});
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert!(s.contains('é'));
    }
}
