// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content-addressed bid packages.

use crate::context::Seat;
use crate::pairing::Pairing;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Raw format a `BidPackage` was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Airline-published PDF bid package.
    Pdf,
    /// CSV export.
    Csv,
    /// Newline-delimited JSON.
    Jsonl,
    /// Plain text.
    Txt,
}

/// A normalized, content-addressed bid package.
///
/// Owns its pairings directly (`Vec<Pairing>`); every other structure that
/// refers to a pairing does so by `pairing_id` or vector index, never by
/// copying the `Pairing` itself. Shared-read once stored; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BidPackage {
    /// SHA-256 of the raw uploaded bytes, hex-encoded.
    pub package_id: String,
    /// Airline code.
    pub airline: String,
    /// Bid month, `YYYY-MM`.
    pub month: String,
    /// Domicile base airport code.
    pub base: String,
    /// Fleet/equipment code this package applies to.
    pub fleet: String,
    /// Seat position this package applies to.
    pub seat: Seat,
    /// Ingestion timestamp.
    pub uploaded_at: DateTime<Utc>,
    /// Raw format the bytes were parsed from.
    pub source_format: SourceFormat,
    /// Parsed pairings, in source order.
    pub pairings: Vec<Pairing>,
}

/// Summary returned by `Ingest`, independent of the full parsed package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PackageSummary {
    /// Number of pairings (trips).
    pub trips: u32,
    /// Total number of duty periods (legs) across all pairings.
    pub legs: u32,
    /// Number of distinct calendar days the package's pairings span.
    pub date_span: u32,
    /// Sum of `credit_minutes` across all pairings.
    pub credit_total: u32,
}

impl BidPackage {
    /// Build the `PackageSummary` for this package's current pairing set.
    #[must_use]
    pub fn summarize(&self) -> PackageSummary {
        use std::collections::BTreeSet;

        let trips = self.pairings.len() as u32;
        let legs = self
            .pairings
            .iter()
            .map(|p| p.duty_periods.len() as u32)
            .sum();
        let dates: BTreeSet<_> = self
            .pairings
            .iter()
            .flat_map(|p| p.dates.iter())
            .collect();
        let credit_total = self.pairings.iter().map(|p| p.credit_minutes).sum();
        PackageSummary {
            trips,
            legs,
            date_span: dates.len() as u32,
            credit_total,
        }
    }
}
