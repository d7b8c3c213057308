// SPDX-License-Identifier: MIT OR Apache-2.0
//! PBS bid layer artifacts and lint reports.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Member of `values`.
    In,
    /// Not a member of `values`.
    NotIn,
    /// Within an inclusive range given by the first two `values`.
    Between,
}

/// A single filter condition within a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Filter {
    /// Pairing field or derived feature the filter applies to.
    #[serde(rename = "type")]
    pub filter_type: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Comparison operands; one value for scalar ops, two for `Between`, any
    /// number for `In`/`NotIn`.
    pub values: Vec<Value>,
}

/// Whether a layer prefers or excludes pairings matching its filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum PreferDirective {
    /// Prefer pairings matching this layer's filters.
    Yes,
    /// Exclude pairings matching this layer's filters.
    No,
}

/// One PBS bid layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Layer {
    /// Position in the layer sequence; strictly increasing from 1.
    pub n: u32,
    /// Filters this layer applies, all ANDed together.
    pub filters: Vec<Filter>,
    /// Whether matching pairings are preferred or excluded.
    pub prefer: PreferDirective,
    /// Estimated probability this layer results in an award, from
    /// historical statistics or, absent stats, a calibrated prior.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award_probability: Option<f64>,
}

/// Kind of a single lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LintKind {
    /// A later layer is fully covered by an earlier same-polarity layer.
    Shadow,
    /// Two layers assert incompatible preferences on the same feature.
    Contradiction,
    /// A filter has no selective effect given prior layers.
    RedundantFilter,
    /// Violation of airline dialect constraints from the active rule pack.
    AirlineSpecific,
    /// A layer's filter set resolves to the empty pairing set.
    EmptyLayer,
}

/// One lint finding attached to a `BidLayerArtifact`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LintEntry {
    /// Kind of finding.
    pub kind: LintKind,
    /// Layers (`Layer::n`) this finding concerns.
    pub layers: Vec<u32>,
    /// Human-readable detail.
    pub detail: String,
}

/// Lint findings grouped by severity. Attaching a `LintReport` never
/// mutates the artifact's `layers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LintReport {
    /// Disqualifying findings.
    #[serde(default)]
    pub errors: Vec<LintEntry>,
    /// Advisory findings.
    #[serde(default)]
    pub warnings: Vec<LintEntry>,
    /// Informational findings.
    #[serde(default)]
    pub info: Vec<LintEntry>,
}

/// A complete, ordered bid submission in the airline's PBS dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BidLayerArtifact {
    /// Airline code.
    pub airline: String,
    /// PBS dialect format; currently only `PBS2` is modeled.
    pub format: String,
    /// Bid month, `YYYY-MM`.
    pub month: String,
    /// Layers in submission order, `n` starting at 1 and strictly
    /// increasing.
    pub layers: Vec<Layer>,
    /// Lint findings for this artifact.
    #[serde(default)]
    pub lint: LintReport,
    /// SHA-256 of the canonical byte rendering, set once exported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_hash: Option<String>,
}

impl BidLayerArtifact {
    /// `true` if `layers` are numbered `1..=len` with no gaps or repeats.
    #[must_use]
    pub fn has_valid_layer_numbering(&self) -> bool {
        self.layers
            .iter()
            .enumerate()
            .all(|(i, l)| l.n == (i as u32) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_numbering_starts_at_one_and_is_contiguous() {
        let artifact = BidLayerArtifact {
            airline: "UAL".into(),
            format: "PBS2".into(),
            month: "2025-09".into(),
            layers: vec![
                Layer {
                    n: 1,
                    filters: vec![],
                    prefer: PreferDirective::Yes,
                    award_probability: None,
                },
                Layer {
                    n: 2,
                    filters: vec![],
                    prefer: PreferDirective::No,
                    award_probability: None,
                },
            ],
            lint: LintReport::default(),
            export_hash: None,
        };
        assert!(artifact.has_valid_layer_numbering());
    }

    #[test]
    fn gap_in_numbering_is_invalid() {
        let artifact = BidLayerArtifact {
            airline: "UAL".into(),
            format: "PBS2".into(),
            month: "2025-09".into(),
            layers: vec![Layer {
                n: 2,
                filters: vec![],
                prefer: PreferDirective::Yes,
                award_probability: None,
            }],
            lint: LintReport::default(),
            export_hash: None,
        };
        assert!(!artifact.has_valid_layer_numbering());
    }
}
