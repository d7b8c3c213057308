// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content-addressed bid-package store.
//!
//! Packages are addressed by the SHA-256 of their raw uploaded bytes, so
//! uploading byte-identical content twice (the common case: a pilot
//! re-uploads the same PDF the airline published) is a lookup, never a
//! re-parse.

use crate::detect::FormatDetector;
use crate::parsers::{self, DialectRegistry, ParseError};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use vb_core::{BidPackage, Seat, SourceFormat};
use vb_retry::{retry_async, RetryConfig};

/// Backoff policy for the content-addressed package read, a transient
/// filesystem error aside (spec §5 "package read 3s", §7 "retries exist
/// only for idempotent upstream calls... package read"). A read of a
/// missing file is not retried — see `is_transient` below.
fn package_read_retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        base_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(200),
        overall_timeout: Duration::from_secs(3),
        jitter_factor: 0.2,
    }
}

/// `true` for I/O errors worth retrying: the file exists but the read was
/// interrupted or would have blocked. A genuinely missing package should
/// 404 immediately rather than wait out a retry budget.
fn is_transient(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

/// Errors raised while ingesting or looking up a bid package.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Bytes did not match any known [`SourceFormat`].
    #[error("could not determine the format of the uploaded file")]
    UnrecognizedFormat,
    /// The detected format's parser failed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A store read/write failed.
    #[error("package store I/O error at {path}: {source}")]
    Io {
        /// Path involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// `serde_json` (de)serialization of the stored manifest failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// No package exists for the requested id.
    #[error("no bid package found for id {0}")]
    NotFound(String),
}

/// Metadata supplied by the caller alongside the raw upload; everything
/// else is derived from the bytes themselves.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Airline code, e.g. `"UAL"`.
    pub airline: String,
    /// Bid month, `YYYY-MM`.
    pub month: String,
    /// Pilot's base.
    pub base: String,
    /// Fleet/equipment type.
    pub fleet: String,
    /// Seat.
    pub seat: Seat,
    /// Original filename, if known (used only as a format-detection hint).
    pub filename: Option<String>,
}

/// Filesystem-backed content-addressed package store.
///
/// Layout under `root`: `packages/{hash}.bin` (raw uploaded bytes) and
/// `packages/{hash}.json` (the derived [`BidPackage`] manifest). The
/// `.json` file's existence is the source of truth for "already ingested".
pub struct PackageStore {
    root: PathBuf,
    detector: FormatDetector,
    pdf_dialects: DialectRegistry,
    inflight: Mutex<HashMap<String, Arc<Notify>>>,
}

impl PackageStore {
    /// Create a store rooted at `root` (typically `$PACKAGE_STORE_DIR`).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            detector: FormatDetector::new(),
            pdf_dialects: DialectRegistry::with_builtins(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    fn bin_path(&self, hash: &str) -> PathBuf {
        self.packages_dir().join(format!("{hash}.bin"))
    }

    fn json_path(&self, hash: &str) -> PathBuf {
        self.packages_dir().join(format!("{hash}.json"))
    }

    /// Ingest raw bytes, parsing them into a [`BidPackage`] only if no
    /// package with this content hash already exists.
    pub async fn ingest(
        &self,
        bytes: &[u8],
        request: IngestRequest,
    ) -> Result<BidPackage, IngestError> {
        let hash = format!("{:x}", Sha256::digest(bytes));

        if let Some(existing) = self.lookup(&hash).await.ok() {
            return Ok(existing);
        }

        let notify = {
            let mut inflight = self.inflight.lock().await;
            if let Some(existing) = inflight.get(&hash) {
                Some(existing.clone())
            } else {
                inflight.insert(hash.clone(), Arc::new(Notify::new()));
                None
            }
        };

        if let Some(notify) = notify {
            notify.notified().await;
            return self.lookup(&hash).await;
        }

        let result = self.parse_and_write(bytes, &hash, request).await;
        let notify = self.inflight.lock().await.remove(&hash);
        if let Some(notify) = notify {
            notify.notify_waiters();
        }
        result
    }

    async fn parse_and_write(
        &self,
        bytes: &[u8],
        hash: &str,
        request: IngestRequest,
    ) -> Result<BidPackage, IngestError> {
        let detection = self
            .detector
            .detect(bytes, request.filename.as_deref())
            .ok_or(IngestError::UnrecognizedFormat)?;

        let pairings = match detection.format {
            SourceFormat::Csv => parsers::parse_csv(bytes)?,
            SourceFormat::Jsonl => parsers::parse_jsonl(bytes)?,
            SourceFormat::Pdf => parsers::parse_pdf(bytes, &self.pdf_dialects)?,
            SourceFormat::Txt => parsers::parse_txt(bytes)?,
        };

        let package = BidPackage {
            package_id: hash.to_string(),
            airline: request.airline,
            month: request.month,
            base: request.base,
            fleet: request.fleet,
            seat: request.seat,
            uploaded_at: chrono::Utc::now(),
            source_format: detection.format,
            pairings,
        };

        tokio::fs::create_dir_all(self.packages_dir())
            .await
            .map_err(|source| IngestError::Io {
                path: self.packages_dir().display().to_string(),
                source,
            })?;
        tokio::fs::write(self.bin_path(hash), bytes)
            .await
            .map_err(|source| IngestError::Io {
                path: self.bin_path(hash).display().to_string(),
                source,
            })?;
        let json = serde_json::to_vec_pretty(&package)?;
        tokio::fs::write(self.json_path(hash), json)
            .await
            .map_err(|source| IngestError::Io {
                path: self.json_path(hash).display().to_string(),
                source,
            })?;

        Ok(package)
    }

    /// Look up a previously ingested package by its content-hash id.
    ///
    /// Retries a transient read failure with backoff; a missing file fails
    /// immediately rather than waiting out the retry budget.
    pub async fn lookup(&self, package_id: &str) -> Result<BidPackage, IngestError> {
        let path = self.json_path(package_id);
        let outcome = retry_async(
            &package_read_retry_config(),
            || {
                let path = path.clone();
                async move { tokio::fs::read(&path).await }
            },
            is_transient,
        )
        .await;
        let bytes = outcome
            .map_err(|_| IngestError::NotFound(package_id.to_string()))?
            .value;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
