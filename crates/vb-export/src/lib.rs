// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Deterministic export rendering, HMAC signing, and the append-only export
//! audit trail (spec §4.8).

pub mod audit;
pub mod render;
pub mod sign;

pub use audit::{AuditError, AuditStore};
pub use render::render_canonical;
pub use sign::{SignError, Signer};

use sha2::{Digest, Sha256};
use vb_core::export::{ExportRecordBuildError, ExportRecordBuilder};
use vb_core::{BidLayerArtifact, ExportRecord};

/// Errors raised while exporting an artifact.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Building the [`ExportRecord`] failed.
    #[error(transparent)]
    Build(#[from] ExportRecordBuildError),
}

/// Render, hash, and sign `artifact`, producing the [`ExportRecord`] to be
/// persisted to the [`AuditStore`] and returned to the caller.
///
/// Does not write to the audit store itself: callers `record()` the result
/// separately, so a caller that only needs the bytes/signature (e.g. a dry
/// run) never touches the database.
pub fn export(
    artifact: &BidLayerArtifact,
    signer: &Signer,
    export_id: impl Into<String>,
    ctx_id: impl Into<String>,
    pilot_id: impl Into<String>,
    issued_at: chrono::DateTime<chrono::Utc>,
) -> Result<(String, ExportRecord), ExportError> {
    let rendered = render_canonical(artifact);
    let export_hash = format!("{:x}", Sha256::digest(rendered.as_bytes()));

    let mut record = ExportRecordBuilder::new()
        .export_id(export_id)
        .artifact_hash(export_hash.clone())
        .signature(String::new())
        .issued_at(issued_at)
        .ctx_id(ctx_id)
        .pilot_id(pilot_id)
        .build()?;

    record.signature = signer.sign(&record.canonical_bytes());

    Ok((rendered, record))
}
