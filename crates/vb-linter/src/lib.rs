// SPDX-License-Identifier: MIT OR Apache-2.0
#![warn(missing_docs)]

//! Static checks over a generated [`BidLayerArtifact`] (spec §4.7): flags
//! shadowed layers, contradictory preferences, redundant filters, dialect
//! violations, and layers that can never match a pairing. Output never
//! mutates the artifact's `layers`, only its attached `lint` record.

pub mod checks;

use vb_core::layer::{BidLayerArtifact, LintKind, LintReport};

pub use checks::KNOWN_FILTER_TYPES;

/// Run every check against `artifact` and return the combined report.
///
/// `known_filter_types` is the set of filter fields the active airline's
/// PBS dialect supports; pass [`KNOWN_FILTER_TYPES`] absent a more specific
/// dialect manifest.
#[must_use]
pub fn lint(artifact: &BidLayerArtifact, known_filter_types: &[&str]) -> LintReport {
    let mut findings = Vec::new();
    checks::shadow(artifact, &mut findings);
    checks::contradiction(artifact, &mut findings);
    checks::redundant_filter(artifact, &mut findings);
    checks::airline_specific(artifact, known_filter_types, &mut findings);
    checks::empty_layer(artifact, &mut findings);

    let mut report = LintReport::default();
    for entry in findings {
        match entry.kind {
            LintKind::Contradiction | LintKind::EmptyLayer | LintKind::AirlineSpecific => {
                report.errors.push(entry)
            }
            LintKind::Shadow | LintKind::RedundantFilter => report.warnings.push(entry),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use vb_core::layer::{Filter, FilterOp, Layer, PreferDirective};

    #[test]
    fn lint_sorts_findings_into_errors_and_warnings() {
        let artifact = BidLayerArtifact {
            airline: "UAL".into(),
            format: "PBS2".into(),
            month: "2025-09".into(),
            layers: vec![
                Layer {
                    n: 1,
                    filters: vec![Filter {
                        filter_type: "credit_minutes".into(),
                        op: FilterOp::Ge,
                        values: vec![serde_json::json!(3000.0)],
                    }],
                    prefer: PreferDirective::Yes,
                    award_probability: None,
                },
                Layer {
                    n: 2,
                    filters: vec![Filter {
                        filter_type: "credit_minutes".into(),
                        op: FilterOp::Ge,
                        values: vec![serde_json::json!(3000.0)],
                    }],
                    prefer: PreferDirective::Yes,
                    award_probability: None,
                },
            ],
            lint: LintReport::default(),
            export_hash: None,
        };
        let report = lint(&artifact, KNOWN_FILTER_TYPES);
        assert!(!report.warnings.is_empty());
        assert!(report.errors.is_empty());
    }

    #[test]
    fn clean_artifact_has_no_findings() {
        let artifact = BidLayerArtifact {
            airline: "UAL".into(),
            format: "PBS2".into(),
            month: "2025-09".into(),
            layers: vec![Layer {
                n: 1,
                filters: vec![Filter {
                    filter_type: "credit_minutes".into(),
                    op: FilterOp::Ge,
                    values: vec![serde_json::json!(3000.0)],
                }],
                prefer: PreferDirective::Yes,
                award_probability: None,
            }],
            lint: LintReport::default(),
            export_hash: None,
        };
        let report = lint(&artifact, KNOWN_FILTER_TYPES);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }
}
