// SPDX-License-Identifier: MIT OR Apache-2.0
//! Strategy directives produced between optimize and layer generation.

use crate::layer::{Filter, PreferDirective};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A partial layer shape proposed by the strategy stage, before the
/// canonicalizer simplifies it and the layer generator assigns `n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LayerTemplate {
    /// Candidate filters, pre-canonicalization.
    pub filters: Vec<Filter>,
    /// Preferred polarity.
    pub prefer: PreferDirective,
    /// Human-readable note on why this template was proposed.
    #[serde(default)]
    pub note: Option<String>,
}

/// Directives produced by the strategy stage, consumed by the layer
/// generator and fed back into a subsequent `Retune` pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StrategyDirectives {
    /// Per-soft-rule weight adjustment to apply on the next optimizer pass.
    #[serde(default)]
    pub weight_deltas: BTreeMap<String, f64>,
    /// Category (e.g. `"weekend"`, `"international"`) to pairing ids the
    /// layer generator should prioritize encoding filters around.
    #[serde(default)]
    pub focus_hints: BTreeMap<String, Vec<String>>,
    /// Proposed layer shapes, in descending specificity.
    #[serde(default)]
    pub layer_templates: Vec<LayerTemplate>,
    /// Human-readable rationale strings.
    #[serde(default)]
    pub rationale: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_are_empty() {
        let d = StrategyDirectives::default();
        assert!(d.weight_deltas.is_empty());
        assert!(d.layer_templates.is_empty());
    }
}
