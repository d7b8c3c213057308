// SPDX-License-Identifier: MIT OR Apache-2.0
//! Turns ranked candidates and parsed preferences into
//! [`StrategyDirectives`] the layer generator consumes (spec §4.6).

use std::collections::BTreeMap;

use vb_core::layer::{Filter, FilterOp, PreferDirective};
use vb_core::preference::{PrefDirection, SoftPref, SoftPrefKind};
use vb_core::strategy::{LayerTemplate, StrategyDirectives};
use vb_core::CandidateSchedule;

/// Whether `direction` maps straight onto the filter's `Ge`/`Eq true`
/// polarity (prefer → include the high/true side, avoid → exclude it).
/// Every kind is literal this way except `WeekendPriority`, whose name
/// describes a goal ("prioritize weekends off") rather than the raw
/// pairing attribute the filter is built from (`includes_weekend`), so its
/// sense is inverted relative to the others.
fn direction_is_literal(kind: &SoftPrefKind) -> bool {
    !matches!(kind, SoftPrefKind::WeekendPriority)
}

fn filter_type_for(kind: &SoftPrefKind) -> &'static str {
    match kind {
        SoftPrefKind::PairingLength => "pairing_days",
        SoftPrefKind::Layovers => "layover_minutes",
        SoftPrefKind::Credit => "credit_minutes",
        SoftPrefKind::WeekendPriority => "includes_weekend",
        SoftPrefKind::International => "is_international",
        SoftPrefKind::Commuting => "commute_friendly",
        SoftPrefKind::Extension { .. } => "extension",
    }
}

fn default_threshold(kind: &SoftPrefKind, stats: &BTreeMap<String, f64>) -> f64 {
    match kind {
        SoftPrefKind::PairingLength => 3.0,
        SoftPrefKind::Layovers => *stats.get("avg_layover_minutes").unwrap_or(&600.0),
        SoftPrefKind::Credit => *stats.get("avg_credit_minutes").unwrap_or(&3000.0),
        _ => 1.0,
    }
}

/// Build one [`LayerTemplate`] from a named soft preference. Boolean-style
/// kinds (weekend/international/commuting) use an `Eq` filter against
/// `true`; numeric kinds use a threshold derived from package statistics,
/// falling back to a fixed constant when the stat is absent.
fn template_for(name: &str, pref: &SoftPref, stats: &BTreeMap<String, f64>) -> LayerTemplate {
    let filter_type = filter_type_for(&pref.kind).to_string();

    let filter = match pref.kind {
        SoftPrefKind::WeekendPriority | SoftPrefKind::International | SoftPrefKind::Commuting => {
            Filter {
                filter_type,
                op: FilterOp::Eq,
                values: vec![serde_json::json!(true)],
            }
        }
        _ => {
            let threshold = default_threshold(&pref.kind, stats);
            Filter {
                filter_type,
                op: FilterOp::Ge,
                values: vec![serde_json::json!(threshold)],
            }
        }
    };

    let prefer = match (direction_is_literal(&pref.kind), pref.direction) {
        (true, PrefDirection::Prefer) => PreferDirective::Yes,
        (true, PrefDirection::Avoid) => PreferDirective::No,
        (false, PrefDirection::Prefer) => PreferDirective::No,
        (false, PrefDirection::Avoid) => PreferDirective::Yes,
    };

    LayerTemplate {
        filters: vec![filter],
        prefer,
        note: Some(format!(
            "derived from soft preference '{name}' (weight {:.2})",
            pref.weight
        )),
    }
}

/// Assemble [`StrategyDirectives`] from the pilot's soft preferences, the
/// package statistics used to pick numeric thresholds, and the top-ranked
/// candidate (for focus hints and carried-forward rationale).
#[must_use]
pub fn build_strategy(
    soft_prefs: &BTreeMap<String, SoftPref>,
    stats: &BTreeMap<String, f64>,
    top_candidate: Option<&CandidateSchedule>,
) -> StrategyDirectives {
    let mut ordered: Vec<(&String, &SoftPref)> = soft_prefs.iter().collect();
    ordered.sort_by(|a, b| b.1.weight.partial_cmp(&a.1.weight).unwrap());

    let layer_templates: Vec<LayerTemplate> = ordered
        .iter()
        .map(|(name, pref)| template_for(name, pref, stats))
        .collect();

    let mut focus_hints: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(candidate) = top_candidate {
        for (name, value) in &candidate.soft_breakdown {
            if *value > 0.0 {
                focus_hints.insert(name.clone(), candidate.pairings.clone());
            }
        }
    }

    let rationale = top_candidate
        .map(|c| c.rationale.clone())
        .unwrap_or_default();

    StrategyDirectives {
        weight_deltas: BTreeMap::new(),
        focus_hints,
        layer_templates,
        rationale,
    }
}
