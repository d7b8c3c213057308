// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rule-pack data model (versioned hard/soft rule declarations).
//!
//! These types are the on-disk YAML shape plus the metadata needed to
//! cache and invalidate a loaded pack. Compiling `check`/`score` expression
//! text into the restricted evaluator AST is `vb-rulepack`'s job; this
//! crate only carries the declaration.

use crate::candidate::Severity;
use crate::preference::PrefDirection;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Pack-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RulePackMeta {
    /// Pack version, e.g. a file revision or semantic version.
    pub version: String,
    /// Airline code this pack governs.
    pub airline: String,
    /// Bid month (or the start of a date range) this pack governs.
    pub month: String,
    /// Name of the allowed expression grammar this pack was authored
    /// against. Declared explicitly so a pack can be rejected rather than
    /// silently misparsed if the evaluator's grammar has since diverged.
    pub expression_dialect: String,
}

/// A declared hard (disqualifying-if-violated) rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HardRuleDef {
    /// Identifier unique within the pack.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Severity if the rule's `check` evaluates false.
    pub severity: Severity,
    /// Restricted boolean expression source text.
    pub check: String,
}

/// A declared soft (score-contributing) rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SoftRuleDef {
    /// Identifier unique within the pack; matches `PreferenceSchema`
    /// soft-pref names when the preference parser targets this pack.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Expression source text yielding a real number, higher is better.
    pub score: String,
    /// Default weight before persona multipliers and normalization.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Optional preferred direction, used by the optimizer's rationale
    /// generation to phrase contributions naturally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<PrefDirection>,
    /// Lower clamp applied to the raw score before weighting.
    #[serde(default = "default_clamp_min")]
    pub clamp_min: f64,
    /// Upper clamp applied to the raw score before weighting.
    #[serde(default = "default_clamp_max")]
    pub clamp_max: f64,
}

fn default_weight() -> f64 {
    1.0
}

fn default_clamp_min() -> f64 {
    -1.0
}

fn default_clamp_max() -> f64 {
    1.0
}

/// A loaded, not-yet-compiled rule pack as deserialized from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RulePackDef {
    /// Pack metadata.
    pub meta: RulePackMeta,
    /// Declared hard rules.
    #[serde(default)]
    pub hard_rules: Vec<HardRuleDef>,
    /// Declared soft rules.
    #[serde(default)]
    pub soft_rules: Vec<SoftRuleDef>,
}

impl RulePackDef {
    /// `true` if every `hard_rules`/`soft_rules` id/name is unique within
    /// its own list. Does not validate expression well-formedness; that is
    /// `vb-rulepack`'s job once expressions are compiled.
    #[must_use]
    pub fn has_unique_ids(&self) -> bool {
        use std::collections::HashSet;

        let mut hard_ids = HashSet::new();
        if !self.hard_rules.iter().all(|r| hard_ids.insert(&r.id)) {
            return false;
        }
        let mut soft_names = HashSet::new();
        self.soft_rules.iter().all(|r| soft_names.insert(&r.name))
    }

    /// Names of all declared soft rules, for reconciling against
    /// `PreferenceSchema::unknown_soft_prefs`.
    #[must_use]
    pub fn soft_rule_names(&self) -> std::collections::BTreeSet<String> {
        self.soft_rules.iter().map(|r| r.name.clone()).collect()
    }
}
