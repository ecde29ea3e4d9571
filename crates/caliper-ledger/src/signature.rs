//! # Ledger Signatures — Keyed Integrity Tags
//!
//! The "digital signature" on an audit record is an integrity tag, not a
//! public-key signature: HMAC-SHA256 over the record's canonical bytes,
//! keyed by a process-wide secret. It answers "was this record written by a
//! holder of the ledger key and unchanged since", which is the property the
//! audit trail needs.
//!
//! ## Security Invariant
//!
//! - Signing input MUST be `&CanonicalBytes` — raw bytes cannot be signed,
//!   so signing and verification always hash the same serialization.
//! - The key is injected at construction and immutable afterwards. There is
//!   no ambient global; a test ledger and a production ledger simply hold
//!   different keys.
//! - Key material never appears in `Debug` output and the key type does not
//!   implement `Serialize`.
//! - Verification compares tags in constant time.
//!
//! ## Versioning
//!
//! Tags carry a scheme version (`v1`) that is also mixed into the MAC input
//! as a domain-separation prefix. A future `v2` scheme can verify historical
//! records by dispatching on the stored version instead of invalidating
//! them.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use caliper_core::CanonicalBytes;

type HmacSha256 = Hmac<Sha256>;

/// Byte length of the signing secret produced by [`SigningKey::generate()`].
const GENERATED_KEY_LEN: usize = 32;

/// Errors in signature handling.
#[derive(Error, Debug)]
pub enum SignatureError {
    /// Key material could not be parsed.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// A stored signature string could not be parsed.
    #[error("invalid signature encoding: {0}")]
    InvalidEncoding(String),
}

/// The version of the signature scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureVersion {
    /// HMAC-SHA256 over JCS canonical bytes.
    V1,
}

impl SignatureVersion {
    /// The identifier stored in serialized signatures.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
        }
    }

    /// The domain-separation prefix mixed into the MAC input.
    fn domain_prefix(&self) -> &'static [u8] {
        match self {
            Self::V1 => b"caliper.audit.v1\x00",
        }
    }

    fn parse(s: &str) -> Result<Self, SignatureError> {
        match s {
            "v1" => Ok(Self::V1),
            other => Err(SignatureError::InvalidEncoding(format!(
                "unknown signature version {other:?}"
            ))),
        }
    }
}

impl std::fmt::Display for SignatureVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The process-wide ledger signing key.
///
/// Loaded once at startup from configuration and injected into the ledger;
/// immutable for the process lifetime. The raw secret is consumed at
/// construction into an initialized MAC instance — the key type does not
/// implement `Serialize`, and `Debug` output is redacted.
#[derive(Clone)]
pub struct SigningKey {
    version: SignatureVersion,
    mac_proto: HmacSha256,
}

impl SigningKey {
    /// Build a key from raw secret bytes.
    ///
    /// # Errors
    ///
    /// Rejects empty secrets — an empty HMAC key would make every tag
    /// forgeable by anyone.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, SignatureError> {
        if secret.is_empty() {
            return Err(SignatureError::InvalidKey(
                "signing key must not be empty".to_string(),
            ));
        }
        let mac_proto = HmacSha256::new_from_slice(secret)
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
        Ok(Self {
            version: SignatureVersion::V1,
            mac_proto,
        })
    }

    /// Build a key from a hex-encoded secret, as loaded from configuration.
    pub fn from_hex(hex: &str) -> Result<Self, SignatureError> {
        let bytes = hex_to_bytes(hex.trim()).map_err(SignatureError::InvalidKey)?;
        Self::from_bytes(&bytes)
    }

    /// Generate a fresh random key from OS randomness.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut secret = [0u8; GENERATED_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        // HMAC accepts keys of any non-zero length.
        Self::from_bytes(&secret).expect("32-byte key is a valid HMAC key")
    }

    /// The scheme version new signatures will carry.
    pub fn version(&self) -> SignatureVersion {
        self.version
    }

    /// Sign canonical bytes, producing a versioned integrity tag.
    pub fn sign(&self, data: &CanonicalBytes) -> LedgerSignature {
        let mac = self.compute(self.version, data);
        LedgerSignature {
            version: self.version,
            mac,
        }
    }

    /// Verify a tag over canonical bytes, in constant time.
    ///
    /// Dispatches on the version stored in the tag, so historical records
    /// remain verifiable after a scheme upgrade.
    pub fn verify(&self, data: &CanonicalBytes, signature: &LedgerSignature) -> bool {
        let computed = self.compute(signature.version, data);
        computed.as_slice().ct_eq(signature.mac.as_slice()).into()
    }

    fn compute(&self, version: SignatureVersion, data: &CanonicalBytes) -> [u8; 32] {
        let mut mac = self.mac_proto.clone();
        mac.update(version.domain_prefix());
        mac.update(data.as_bytes());
        let out = mac.finalize().into_bytes();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&out);
        bytes
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey({}, <redacted>)", self.version)
    }
}

/// A versioned integrity tag: scheme version plus 32-byte MAC.
///
/// Serializes as `v1:<64 hex chars>`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LedgerSignature {
    version: SignatureVersion,
    mac: [u8; 32],
}

impl LedgerSignature {
    /// The scheme version this tag was produced under.
    pub fn version(&self) -> SignatureVersion {
        self.version
    }

    /// Render as the stored string form `v1:<hex>`.
    pub fn to_string_form(&self) -> String {
        let hex: String = self.mac.iter().map(|b| format!("{b:02x}")).collect();
        format!("{}:{hex}", self.version)
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Result<Self, SignatureError> {
        let (version, hex) = s.split_once(':').ok_or_else(|| {
            SignatureError::InvalidEncoding(format!("signature missing version prefix: {s:?}"))
        })?;
        let version = SignatureVersion::parse(version)?;
        let bytes = hex_to_bytes(hex).map_err(SignatureError::InvalidEncoding)?;
        if bytes.len() != 32 {
            return Err(SignatureError::InvalidEncoding(format!(
                "signature must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut mac = [0u8; 32];
        mac.copy_from_slice(&bytes);
        Ok(Self { version, mac })
    }
}

impl Serialize for LedgerSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_form())
    }
}

impl<'de> Deserialize<'de> for LedgerSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for LedgerSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.mac.iter().take(4).map(|b| format!("{b:02x}")).collect();
        write!(f, "LedgerSignature({}:{prefix}...)", self.version)
    }
}

impl std::fmt::Display for LedgerSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_string_form())
    }
}

fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, String> {
    if hex.is_empty() {
        return Err("hex string must not be empty".to_string());
    }
    if hex.len() % 2 != 0 {
        return Err("hex string must have even length".to_string());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| format!("invalid hex at position {i}: {e}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SigningKey {
        SigningKey::from_bytes(b"test-ledger-secret").unwrap()
    }

    fn canonical(value: serde_json::Value) -> CanonicalBytes {
        CanonicalBytes::new(&value).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let k = key();
        let data = canonical(serde_json::json!({"event": "decision_created", "seq": 0}));
        let sig = k.sign(&data);
        assert!(k.verify(&data, &sig));
    }

    #[test]
    fn test_tampered_data_fails() {
        let k = key();
        let original = canonical(serde_json::json!({"reason": "qualified"}));
        let tampered = canonical(serde_json::json!({"reason": "unqualified"}));
        let sig = k.sign(&original);
        assert!(!k.verify(&tampered, &sig));
    }

    #[test]
    fn test_wrong_key_fails() {
        let data = canonical(serde_json::json!({"x": 1}));
        let sig = key().sign(&data);
        let other = SigningKey::from_bytes(b"another-secret").unwrap();
        assert!(!other.verify(&data, &sig));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let k = key();
        let data = canonical(serde_json::json!({"a": 1, "b": 2}));
        assert_eq!(k.sign(&data), k.sign(&data));
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(SigningKey::from_bytes(b"").is_err());
        assert!(SigningKey::from_hex("").is_err());
    }

    #[test]
    fn test_from_hex_matches_from_bytes() {
        let a = SigningKey::from_hex("00ff10ab").unwrap();
        let b = SigningKey::from_bytes(&[0x00, 0xff, 0x10, 0xab]).unwrap();
        let data = canonical(serde_json::json!({"k": "v"}));
        assert_eq!(a.sign(&data), b.sign(&data));
    }

    #[test]
    fn test_generated_keys_differ() {
        let data = canonical(serde_json::json!({"k": "v"}));
        let a = SigningKey::generate();
        let b = SigningKey::generate();
        assert_ne!(a.sign(&data), b.sign(&data));
    }

    #[test]
    fn test_string_form_roundtrip() {
        let sig = key().sign(&canonical(serde_json::json!({"n": 7})));
        let s = sig.to_string_form();
        assert!(s.starts_with("v1:"));
        assert_eq!(s.len(), 3 + 64);
        assert_eq!(LedgerSignature::parse(&s).unwrap(), sig);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(LedgerSignature::parse("no-version-prefix").is_err());
        assert!(LedgerSignature::parse("v9:00").is_err());
        assert!(LedgerSignature::parse("v1:zz").is_err());
        assert!(LedgerSignature::parse("v1:00ff").is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let sig = key().sign(&canonical(serde_json::json!({"n": 7})));
        let json = serde_json::to_string(&sig).unwrap();
        assert!(json.starts_with("\"v1:"));
        let back: LedgerSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(sig, back);
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", key());
        assert_eq!(debug, "SigningKey(v1, <redacted>)");
        assert!(!debug.contains("secret"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Verification succeeds for every signed payload and fails for any
        /// other payload — over arbitrary key and content strings.
        #[test]
        fn sign_verify_roundtrip(
            secret in proptest::collection::vec(any::<u8>(), 1..64),
            content in "[a-z0-9 ]{1,40}",
            other in "[a-z0-9 ]{1,40}",
        ) {
            let key = SigningKey::from_bytes(&secret).unwrap();
            let data = CanonicalBytes::new(&serde_json::json!({"c": content})).unwrap();
            let sig = key.sign(&data);
            prop_assert!(key.verify(&data, &sig));

            if other != content {
                let changed = CanonicalBytes::new(&serde_json::json!({"c": other})).unwrap();
                prop_assert!(!key.verify(&changed, &sig));
            }
        }

        /// The stored string form always parses back to an equal tag.
        #[test]
        fn string_form_roundtrips(
            secret in proptest::collection::vec(any::<u8>(), 1..64),
            content in "[a-z0-9]{0,32}",
        ) {
            let key = SigningKey::from_bytes(&secret).unwrap();
            let data = CanonicalBytes::new(&serde_json::json!({"c": content})).unwrap();
            let sig = key.sign(&data);
            let parsed = LedgerSignature::parse(&sig.to_string_form()).unwrap();
            prop_assert_eq!(parsed, sig);
        }
    }
}
