// SPDX-License-Identifier: MIT OR Apache-2.0
#![warn(missing_docs)]

//! Context Enricher / Feature Fusion (spec §4.4) and the beam-search
//! Optimizer (spec §4.5): fans out rule-pack loading, package lookup, and
//! preference parsing concurrently, fuses them into a [`FeatureBundle`],
//! applies persona weighting, and searches for ranked, hard-ok candidate
//! schedules.

pub mod analytics;
pub mod beam;
pub mod enrich;
pub mod optimize;
pub mod persona;

pub use beam::BeamConfig;
pub use enrich::{enrich, EnrichError, FeatureBundle};
pub use optimize::{optimize, retune};
