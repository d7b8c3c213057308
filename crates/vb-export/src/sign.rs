// SPDX-License-Identifier: MIT OR Apache-2.0
//! HMAC-SHA256 signing of canonicalized export records.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Raised when a signing key is malformed.
#[derive(Debug, Error)]
pub enum SignError {
    /// HMAC accepts keys of any length; this only fails on an empty key,
    /// which would make every export trivially forgeable.
    #[error("signing key must not be empty")]
    EmptyKey,
}

/// Signs and verifies export-record bytes with a shared HMAC-SHA256 key.
#[derive(Clone)]
pub struct Signer {
    key: Vec<u8>,
}

impl Signer {
    /// Build a signer from a raw key, typically loaded from
    /// `$EXPORT_SIGNING_KEY`.
    pub fn new(key: impl Into<Vec<u8>>) -> Result<Self, SignError> {
        let key = key.into();
        if key.is_empty() {
            return Err(SignError::EmptyKey);
        }
        Ok(Self { key })
    }

    /// Hex-encoded HMAC-SHA256 of `bytes`.
    #[must_use]
    pub fn sign(&self, bytes: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(bytes);
        hex_encode(&mac.finalize().into_bytes())
    }

    /// Verify a previously produced signature over `bytes`.
    #[must_use]
    pub fn verify(&self, bytes: &[u8], signature: &str) -> bool {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(bytes);
        let Some(expected) = hex_decode(signature) else {
            return false;
        };
        mac.verify_slice(&expected).is_ok()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_its_own_signature() {
        let signer = Signer::new(b"test-key".to_vec()).unwrap();
        let sig = signer.sign(b"hello world");
        assert!(signer.verify(b"hello world", &sig));
    }

    #[test]
    fn verify_rejects_tampered_bytes() {
        let signer = Signer::new(b"test-key".to_vec()).unwrap();
        let sig = signer.sign(b"hello world");
        assert!(!signer.verify(b"hello mars", &sig));
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(Signer::new(Vec::new()).is_err());
    }
}
