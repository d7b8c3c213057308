// SPDX-License-Identifier: MIT OR Apache-2.0
//! Signed export records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A signed, auditable record of one layer-artifact export.
///
/// `signature` is excluded from the hash used to compute itself: callers
/// canonicalize with [`ExportRecord::canonical_bytes`], which nulls out
/// `signature` before serializing, then HMAC-sign those bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExportRecord {
    /// Identifier unique to this export.
    pub export_id: String,
    /// SHA-256 of the canonical byte rendering of the exported artifact.
    pub artifact_hash: String,
    /// HMAC-SHA256 of the canonical bytes, hex-encoded.
    pub signature: String,
    /// When this export was issued.
    pub issued_at: DateTime<Utc>,
    /// Request context this export was produced under.
    pub ctx_id: String,
    /// Pilot this export belongs to, pseudonymized if policy requires.
    pub pilot_id: String,
}

/// Error building an `ExportRecord`.
#[derive(Debug, thiserror::Error)]
pub enum ExportRecordBuildError {
    /// A required field was never set.
    #[error("missing required export field: {0}")]
    MissingField(&'static str),
}

/// Fluent builder for `ExportRecord`, mirroring the construction order a
/// caller actually has the data in: artifact hash first, signature last,
/// once the canonical bytes are known.
#[derive(Debug, Default)]
pub struct ExportRecordBuilder {
    export_id: Option<String>,
    artifact_hash: Option<String>,
    signature: Option<String>,
    issued_at: Option<DateTime<Utc>>,
    ctx_id: Option<String>,
    pilot_id: Option<String>,
}

impl ExportRecordBuilder {
    /// Start a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `export_id`.
    #[must_use]
    pub fn export_id(mut self, v: impl Into<String>) -> Self {
        self.export_id = Some(v.into());
        self
    }

    /// Set `artifact_hash`.
    #[must_use]
    pub fn artifact_hash(mut self, v: impl Into<String>) -> Self {
        self.artifact_hash = Some(v.into());
        self
    }

    /// Set `signature`.
    #[must_use]
    pub fn signature(mut self, v: impl Into<String>) -> Self {
        self.signature = Some(v.into());
        self
    }

    /// Set `issued_at`.
    #[must_use]
    pub fn issued_at(mut self, v: DateTime<Utc>) -> Self {
        self.issued_at = Some(v);
        self
    }

    /// Set `ctx_id`.
    #[must_use]
    pub fn ctx_id(mut self, v: impl Into<String>) -> Self {
        self.ctx_id = Some(v.into());
        self
    }

    /// Set `pilot_id`.
    #[must_use]
    pub fn pilot_id(mut self, v: impl Into<String>) -> Self {
        self.pilot_id = Some(v.into());
        self
    }

    /// Build the record, failing if any required field is unset.
    pub fn build(self) -> Result<ExportRecord, ExportRecordBuildError> {
        Ok(ExportRecord {
            export_id: self
                .export_id
                .ok_or(ExportRecordBuildError::MissingField("export_id"))?,
            artifact_hash: self
                .artifact_hash
                .ok_or(ExportRecordBuildError::MissingField("artifact_hash"))?,
            signature: self
                .signature
                .ok_or(ExportRecordBuildError::MissingField("signature"))?,
            issued_at: self
                .issued_at
                .ok_or(ExportRecordBuildError::MissingField("issued_at"))?,
            ctx_id: self
                .ctx_id
                .ok_or(ExportRecordBuildError::MissingField("ctx_id"))?,
            pilot_id: self
                .pilot_id
                .ok_or(ExportRecordBuildError::MissingField("pilot_id"))?,
        })
    }
}

impl ExportRecord {
    /// Canonical JSON bytes of this record with `signature` nulled out, the
    /// input to both signing and verification.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut value = serde_json::to_value(self).expect("ExportRecord always serializes");
        if let Some(obj) = value.as_object_mut() {
            obj.insert("signature".to_string(), serde_json::Value::Null);
        }
        serde_json::to_vec(&value).expect("canonicalized value always serializes")
    }

    /// SHA-256 of `canonical_bytes`, hex-encoded.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ExportRecord {
        ExportRecordBuilder::new()
            .export_id("exp-1")
            .artifact_hash("deadbeef")
            .signature("sig-placeholder")
            .issued_at(Utc::now())
            .ctx_id("ctx-1")
            .pilot_id("P1")
            .build()
            .unwrap()
    }

    #[test]
    fn content_hash_ignores_signature_value() {
        let mut a = record();
        let mut b = record();
        a.signature = "sig-a".into();
        b.signature = "sig-b".into();
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn builder_rejects_missing_field() {
        let err = ExportRecordBuilder::new().export_id("exp-1").build();
        assert!(err.is_err());
    }
}
