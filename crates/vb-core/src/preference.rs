// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structured pilot preferences.
//!
//! The source program kept preferences as an open Python dict; per the
//! redesign flag in spec §9 this is rebuilt as a closed set of known
//! preference kinds plus an `Extension` variant for names a rule pack
//! declares but this crate does not yet know about.

use crate::context::Seat;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Direction of a soft preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrefDirection {
    /// Higher values of the target feature are better.
    Prefer,
    /// Lower values of the target feature are better.
    Avoid,
}

/// Closed set of soft-preference kinds known to the pipeline, plus an
/// escape hatch for rule-pack-declared extensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SoftPrefKind {
    /// Preferred pairing length in days.
    PairingLength,
    /// Layover quality/duration.
    Layovers,
    /// Total monthly credit.
    Credit,
    /// Weekends-off priority.
    WeekendPriority,
    /// International flying.
    International,
    /// Commute-friendly report/release times.
    Commuting,
    /// A soft-rule name declared by the active rule pack but not otherwise
    /// known to this crate.
    Extension {
        /// The rule-pack-declared soft rule name.
        name: String,
    },
}

/// One entry of `PreferenceSchema.soft_prefs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SoftPref {
    /// What kind of preference this is.
    pub kind: SoftPrefKind,
    /// Prefer or avoid.
    pub direction: PrefDirection,
    /// Optional target value (e.g. a specific pairing length).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<serde_json::Value>,
    /// Relative importance in `[0, 1]`.
    pub weight: f64,
}

/// Hard (must-satisfy) constraints extracted from preference text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HardConstraints {
    /// ISO dates the pilot must have off.
    #[serde(default)]
    pub days_off: BTreeSet<chrono::NaiveDate>,
    /// Whether red-eye pairings must be excluded entirely.
    #[serde(default)]
    pub no_red_eyes: bool,
    /// Optional cap on duty minutes per day (`max_duty_hours_per_day * 60`
    /// is checked by the rule pack's `far117` namespace).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duty_hours_per_day: Option<u32>,
    /// Rule-family tags the candidate must be evaluated against, e.g.
    /// `{"FAR117"}`.
    #[serde(default)]
    pub legalities: BTreeSet<String>,
}

/// How a `PreferenceSchema` was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParserMethod {
    /// The primary LLM produced the schema.
    Llm,
    /// A secondary (smaller/faster) LLM produced the schema after the
    /// primary failed or timed out.
    LlmFallback,
    /// Only the rule-based prefilter ran; no LLM call succeeded.
    RuleBased,
}

/// Provenance attached to a parsed `PreferenceSchema`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PreferenceSource {
    /// Named persona supplied by the caller, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    /// The original free text.
    #[serde(default)]
    pub text: String,
    /// Which parsing path produced this schema.
    #[serde(default = "default_parser_method")]
    pub parser_method: ParserMethod,
    /// LLM output keys that did not map to a recognized `PreferenceSchema`
    /// field, recorded rather than silently dropped.
    #[serde(default)]
    pub unrecognized: Vec<String>,
}

fn default_parser_method() -> ParserMethod {
    ParserMethod::RuleBased
}

/// Structured preferences derived from natural-language bid instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PreferenceSchema {
    /// Pilot these preferences belong to.
    pub pilot_id: String,
    /// Airline code.
    pub airline: String,
    /// Domicile base.
    pub base: String,
    /// Seat position.
    pub seat: Seat,
    /// Qualified equipment.
    pub equip: Vec<String>,
    /// Hard constraints, known subset per §3.
    pub hard_constraints: HardConstraints,
    /// Open mapping of named soft preferences.
    #[serde(default)]
    pub soft_prefs: BTreeMap<String, SoftPref>,
    /// Version tag for the weight-normalization scheme the optimizer used.
    pub weights_version: String,
    /// Parser confidence in `[0, 1]`.
    pub confidence: f64,
    /// Provenance.
    pub source: PreferenceSource,
}

/// Soft-preference names reserved for pipeline-internal bookkeeping; these
/// never require rule-pack declaration.
const RESERVED_PREFIX: &str = "x_";

impl PreferenceSchema {
    /// Returns `true` if `name` falls in the reserved namespace (§3
    /// invariant: "unknown names are warnings, not errors" only applies to
    /// names outside both the rule pack's declared soft rules and this
    /// reserved namespace).
    #[must_use]
    pub fn is_reserved_namespace(name: &str) -> bool {
        name.starts_with(RESERVED_PREFIX)
    }

    /// Soft-pref names that are neither declared by `declared_soft_rules`
    /// nor in the reserved namespace. Per §3 these are warnings, not hard
    /// validation errors.
    #[must_use]
    pub fn unknown_soft_prefs(&self, declared_soft_rules: &BTreeSet<String>) -> Vec<String> {
        self.soft_prefs
            .keys()
            .filter(|name| {
                !declared_soft_rules.contains(*name) && !Self::is_reserved_namespace(name)
            })
            .cloned()
            .collect()
    }
}
