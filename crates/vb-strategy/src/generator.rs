// SPDX-License-Identifier: MIT OR Apache-2.0
//! Turns canonicalized [`LayerTemplate`]s into a numbered
//! [`BidLayerArtifact`], annotating each layer with an estimated award
//! probability (spec §4.6 step 4).

use std::collections::BTreeMap;

use vb_core::layer::{BidLayerArtifact, Layer, LintReport, PreferDirective};
use vb_core::strategy::LayerTemplate;
use vb_core::ContextSnapshot;

use crate::canonicalize::canonicalize;

/// Fraction each successive layer's award probability decays by, relative
/// to the first. Reflects later layers being progressively less
/// constrained and so less likely to be the layer that actually wins the
/// award (the pilot already got an earlier, more specific layer first).
const SPECIFICITY_DECAY: f64 = 0.1;

/// Award probability for layer `index` (0-based) when no historical
/// statistic applies: seniority alone, decayed by position.
fn calibrated_prior(ctx: &ContextSnapshot, index: usize) -> f64 {
    let decay = (1.0 - SPECIFICITY_DECAY * index as f64).max(0.0);
    (ctx.seniority_percentile * decay).clamp(0.0, 1.0)
}

/// Award probability from the `stats` namespace when the layer's sole
/// filter type has a directly matching historical rate, else `None`.
fn stats_probability(template: &LayerTemplate, stats: &BTreeMap<String, f64>) -> Option<f64> {
    let filter = template.filters.first()?;
    let key = match filter.filter_type.as_str() {
        "includes_weekend" => "weekend_rate",
        "has_red_eye" => "red_eye_rate",
        _ => return None,
    };
    stats.get(key).copied().map(|rate| match template.prefer {
        PreferDirective::Yes => rate,
        PreferDirective::No => 1.0 - rate,
    })
}

/// Canonicalize `templates`, number them `1..=len`, and annotate each with
/// an award probability: a direct historical rate when the `stats`
/// namespace covers the layer's filter, otherwise a seniority-calibrated
/// prior that decays with layer position.
#[must_use]
pub fn generate_layers(
    ctx: &ContextSnapshot,
    airline: String,
    month: String,
    templates: Vec<LayerTemplate>,
    stats: &BTreeMap<String, f64>,
) -> BidLayerArtifact {
    let canonical = canonicalize(templates);

    let layers = canonical
        .into_iter()
        .enumerate()
        .map(|(i, template)| {
            let award_probability = stats_probability(&template, stats)
                .unwrap_or_else(|| calibrated_prior(ctx, i));
            Layer {
                n: (i as u32) + 1,
                filters: template.filters,
                prefer: template.prefer,
                award_probability: Some(award_probability),
            }
        })
        .collect();

    BidLayerArtifact {
        airline,
        format: "PBS2".to_string(),
        month,
        layers,
        lint: LintReport::default(),
        export_hash: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vb_core::layer::{Filter, FilterOp};
    use vb_core::context::Seat;

    fn ctx(seniority_percentile: f64) -> ContextSnapshot {
        ContextSnapshot {
            ctx_id: "ctx-1".into(),
            pilot_id: "P1".into(),
            airline: "UAL".into(),
            month: "2025-09".into(),
            base: "DEN".into(),
            seat: Seat::Fo,
            equip: vec!["737".into()],
            seniority_percentile,
            commuting_profile: Default::default(),
            default_weights: Default::default(),
        }
    }

    fn template(filter_type: &str, prefer: PreferDirective) -> LayerTemplate {
        LayerTemplate {
            filters: vec![Filter {
                filter_type: filter_type.into(),
                op: FilterOp::Eq,
                values: vec![serde_json::json!(true)],
            }],
            prefer,
            note: None,
        }
    }

    #[test]
    fn layers_are_numbered_contiguously_from_one() {
        let artifact = generate_layers(
            &ctx(0.8),
            "UAL".into(),
            "2025-09".into(),
            vec![
                template("is_international", PreferDirective::Yes),
                template("commute_friendly", PreferDirective::Yes),
            ],
            &BTreeMap::new(),
        );
        assert!(artifact.has_valid_layer_numbering());
    }

    #[test]
    fn stats_namespace_yields_direct_probability() {
        let mut stats = BTreeMap::new();
        stats.insert("weekend_rate".to_string(), 0.3);
        let artifact = generate_layers(
            &ctx(0.5),
            "UAL".into(),
            "2025-09".into(),
            vec![template("includes_weekend", PreferDirective::No)],
            &stats,
        );
        assert_eq!(artifact.layers[0].award_probability, Some(0.7));
    }

    #[test]
    fn absent_stats_fall_back_to_decaying_calibrated_prior() {
        let artifact = generate_layers(
            &ctx(0.8),
            "UAL".into(),
            "2025-09".into(),
            vec![
                template("is_international", PreferDirective::Yes),
                template("commute_friendly", PreferDirective::Yes),
            ],
            &BTreeMap::new(),
        );
        let first = artifact.layers[0].award_probability.unwrap();
        let second = artifact.layers[1].award_probability.unwrap();
        assert!((first - 0.8).abs() < 1e-9);
        assert!(second < first);
    }

    #[test]
    fn prior_is_clamped_into_unit_range() {
        let artifact = generate_layers(
            &ctx(1.0),
            "UAL".into(),
            "2025-09".into(),
            vec![template("is_international", PreferDirective::Yes)],
            &BTreeMap::new(),
        );
        let p = artifact.layers[0].award_probability.unwrap();
        assert!((0.0..=1.0).contains(&p));
    }
}
