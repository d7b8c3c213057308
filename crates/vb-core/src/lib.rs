// SPDX-License-Identifier: MIT OR Apache-2.0
//! vb-core
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The stable data model for VectorBid.
//!
//! Every other crate in the workspace depends on this one for the shapes of
//! preferences, pairings, bid packages, rule packs, candidate schedules, and
//! bid layer artifacts. Mutable structures here are owned exclusively by the
//! request that created them; rule packs and parsed bid packages are
//! shared-read and never mutated post-load (see [`package`] and
//! [`rulepack`]).

/// Candidate monthly schedules produced by the optimizer.
pub mod candidate;
/// Ephemeral per-request pilot context.
pub mod context;
/// Signed export records.
pub mod export;
/// PBS bid layer artifacts and lint reports.
pub mod layer;
/// Parsed trips ("pairings").
pub mod pairing;
/// Content-addressed bid packages.
pub mod package;
/// Structured pilot preferences.
pub mod preference;
/// PII redaction helpers shared by logging and the LLM adapter.
pub mod redact;
/// Rule-pack data model (versioned hard/soft rule declarations).
pub mod rulepack;
/// Strategy directives produced between optimize and layer generation.
pub mod strategy;

pub use candidate::{CandidateSchedule, CandidateState, LegalCitation, Severity, Violation};
pub use context::{ContextSnapshot, Seat};
pub use export::ExportRecord;
pub use layer::{
    BidLayerArtifact, Filter, FilterOp, Layer, LintEntry, LintKind, LintReport, PreferDirective,
};
pub use pairing::{DutyPeriod, Layover, Pairing};
pub use package::{BidPackage, PackageSummary, SourceFormat};
pub use preference::{
    HardConstraints, ParserMethod, PrefDirection, PreferenceSchema, PreferenceSource, SoftPref,
    SoftPrefKind,
};
pub use rulepack::{HardRuleDef, RulePackDef, RulePackMeta, SoftRuleDef};
pub use strategy::{LayerTemplate, StrategyDirectives};

/// Pipeline version string embedded in determinism-sensitive identifiers
/// (`candidate_id`) and exposed on `/api/meta/version`.
///
/// Bump this whenever optimizer scoring, the DSL grammar, or the layer
/// canonicalizer changes in a way that could alter output for fixed inputs.
pub const PIPELINE_VERSION: &str = "vectorbid/v0.1";
