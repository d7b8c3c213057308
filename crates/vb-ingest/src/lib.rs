// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Bid-package ingestion: format detection, per-format parsing, and a
//! content-addressed store (spec §4.1).

pub mod detect;
pub mod parsers;
pub mod store;

pub use detect::{DetectionResult, FormatDetector};
pub use parsers::{DialectRegistry, ParseError, PdfDialect, UalDialect};
pub use store::{IngestError, IngestRequest, PackageStore};
