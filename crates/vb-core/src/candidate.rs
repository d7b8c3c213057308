// SPDX-License-Identifier: MIT OR Apache-2.0
//! Candidate monthly schedules produced by the optimizer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Severity of a hard-rule hit or violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Disqualifying: the candidate is not hard-ok.
    Error,
    /// Advisory only; does not disqualify the candidate.
    Warn,
}

/// A hard-rule hit recorded against a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    /// Hard rule that produced this hit.
    pub rule_id: String,
    /// Severity of the hit.
    pub severity: Severity,
    /// Human-readable detail.
    pub detail: String,
}

/// One entry of a candidate's `legal_explanation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LegalCitation {
    /// The hard rule this explanation covers.
    pub rule_id: String,
    /// Human-readable detail of how the rule applied.
    pub detail: String,
    /// Optional citation into the governing contract or regulation text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_citation: Option<String>,
}

/// Candidate lifecycle stage.
///
/// `Dropped` terminates the state machine without further mutation; a
/// dropped candidate is never scored, ranked, or emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CandidateState {
    /// Pairing set selected by beam search, not yet evaluated.
    Constructed,
    /// `EvaluateHard` has run.
    HardChecked,
    /// `ScoreSoft` has run and a final score assigned.
    Scored,
    /// Position among top-K assigned.
    Ranked,
    /// Returned to the caller.
    Emitted,
    /// Removed from consideration at any stage prior to `Emitted`.
    Dropped,
}

/// A candidate monthly schedule: an ordered set of pairings plus its
/// legality and scoring results.
///
/// Stores pairing membership by `pairing_id`, never by copying `Pairing`
/// values out of the owning `BidPackage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CandidateSchedule {
    /// Deterministic hash of `{ctx_id, selected pairing_ids, weights_version,
    /// rule_pack_version}`.
    pub candidate_id: String,
    /// Current lifecycle stage.
    pub state: CandidateState,
    /// Ordered set of pairing ids making up this candidate.
    pub pairings: Vec<String>,
    /// Final scalar score. `0.0` until `Scored`.
    pub score: f64,
    /// Whether the candidate is free of `Severity::Error` violations.
    pub hard_ok: bool,
    /// Per-soft-rule contribution to `score`.
    pub soft_breakdown: BTreeMap<String, f64>,
    /// Hard-rule hits recorded during `EvaluateHard`.
    pub violations: Vec<Violation>,
    /// Human-readable rationale strings, top positive/negative contributions.
    pub rationale: Vec<String>,
    /// Structured legality explanation, one entry per hard rule that applied.
    pub legal_explanation: Vec<LegalCitation>,
}

impl CandidateSchedule {
    /// Compute the deterministic `candidate_id` for a pairing selection.
    ///
    /// `pairing_ids` is sorted internally so that selection order never
    /// affects the hash.
    #[must_use]
    pub fn compute_id(
        ctx_id: &str,
        pairing_ids: &[String],
        weights_version: &str,
        rule_pack_version: &str,
    ) -> String {
        let mut sorted: Vec<&str> = pairing_ids.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        let mut hasher = Sha256::new();
        hasher.update(ctx_id.as_bytes());
        hasher.update(b"\0");
        hasher.update(sorted.join(",").as_bytes());
        hasher.update(b"\0");
        hasher.update(weights_version.as_bytes());
        hasher.update(b"\0");
        hasher.update(rule_pack_version.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// `true` once `hard_ok` has been computed and the candidate has not
    /// been dropped, i.e. it is eligible to appear in top-K.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.hard_ok && self.state != CandidateState::Dropped
    }
}
