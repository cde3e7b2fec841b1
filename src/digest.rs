use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::convert::{to_json, ConvertError};
use crate::validation::ValidationError;
use crate::value::Value;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlg {
    /// SHA-256 (the default).
    #[serde(rename = "sha-256")]
    Sha256,
}

/// Algorithm + digest bytes, encoded as base64url without padding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    /// Digest algorithm.
    pub alg: DigestAlg,
    /// Base64URL (no padding) digest bytes.
    pub b64: String,
}

impl Digest {
    /// Constructs a validated digest.
    pub fn new(alg: DigestAlg, b64: impl Into<String>) -> Result<Self, ValidationError> {
        let b64 = b64.into();
        let re = Regex::new(r"^[A-Za-z0-9_-]{43,44}$").expect("invalid regex");
        if !re.is_match(&b64) {
            return Err(ValidationError::PatternMismatch {
                field: "digest",
                value: b64,
            });
        }
        Ok(Digest { alg, b64 })
    }
}

/// Error computing a content digest.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// The value has no JSON form.
    #[error(transparent)]
    Convert(#[from] ConvertError),
    /// Canonical serialization failed.
    #[error("canonical serialization failed: {0}")]
    Canonicalize(String),
}

/// Content digest of a value: SHA-256 over its canonical (RFC 8785) JSON
/// bytes.
///
/// Deeply-equal values digest identically regardless of key insertion order.
/// Type tags do not survive the JSON form and do not contribute; use identity
/// comparison when tag distinctions matter.
pub fn digest_value(value: &Value) -> Result<Digest, DigestError> {
    let json = to_json(value)?;
    let canonical = canonical_json::to_string(&json)
        .map_err(|err| DigestError::Canonicalize(format!("{err:?}")))?;
    let hash = Sha256::digest(canonical.as_bytes());
    Ok(Digest {
        alg: DigestAlg::Sha256,
        b64: URL_SAFE_NO_PAD.encode(hash),
    })
}
