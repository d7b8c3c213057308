// SPDX-License-Identifier: MIT OR Apache-2.0
//! Public optimizer entry points: run the beam search over an enriched
//! [`FeatureBundle`], and re-score an existing candidate set against
//! adjusted weights without re-searching (spec §4.5 `Retune`).

use std::collections::BTreeMap;

use vb_core::CandidateSchedule;

use crate::beam::{self, BeamConfig};
use crate::enrich::FeatureBundle;
use crate::persona;

/// Apply persona weighting to `bundle.preferences.soft_prefs` and run the
/// beam search, returning ranked, hard-ok-only candidates.
///
/// Takes `bundle` by value since persona application mutates
/// `preferences.soft_prefs` in place and the bundle is not reused after
/// scoring (§3: a `FeatureBundle` is built fresh per request).
#[must_use]
pub fn optimize(mut bundle: FeatureBundle, config: &BeamConfig) -> Vec<CandidateSchedule> {
    let persona = bundle.preferences.source.persona.clone();
    persona::apply(&mut bundle.preferences.soft_prefs, persona.as_deref());
    beam::search(&bundle, config)
}

/// Re-score already hard-ok candidates against `weight_deltas` without
/// rerunning the search.
///
/// Each entry in `weight_deltas` names a soft-rule and a fractional change
/// to apply to every breakdown entry that rule produced: a candidate's
/// `soft_breakdown[name]` is scaled by `(1.0 + delta).max(0.0)`. Rules not
/// named in `weight_deltas` are left untouched. `score` and `rationale` are
/// recomputed from the adjusted breakdown; `hard_ok`/`violations` are
/// unaffected, since retuning only ever changes soft scoring.
pub fn retune(
    candidates: &mut [CandidateSchedule],
    weight_deltas: &BTreeMap<String, f64>,
) {
    for candidate in candidates.iter_mut() {
        for (name, delta) in weight_deltas {
            if let Some(value) = candidate.soft_breakdown.get_mut(name) {
                *value *= (1.0 + delta).max(0.0);
            }
        }
        candidate.score = candidate.soft_breakdown.values().sum();
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap()
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });

    for candidate in candidates.iter_mut() {
        let mut entries: Vec<(&String, &f64)> = candidate.soft_breakdown.iter().collect();
        entries.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap());
        candidate.rationale = entries
            .into_iter()
            .take(5)
            .map(|(name, value)| {
                if *value >= 0.0 {
                    format!("{name} contributed +{value:.3}")
                } else {
                    format!("{name} contributed {value:.3}")
                }
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vb_core::CandidateState;

    fn candidate(id: &str, breakdown: &[(&str, f64)]) -> CandidateSchedule {
        CandidateSchedule {
            candidate_id: id.to_string(),
            state: CandidateState::Ranked,
            pairings: vec![],
            score: breakdown.iter().map(|(_, v)| v).sum(),
            hard_ok: true,
            soft_breakdown: breakdown.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            violations: vec![],
            rationale: vec![],
            legal_explanation: vec![],
        }
    }

    #[test]
    fn retune_rescales_named_rules_only() {
        let mut candidates = vec![candidate("c1", &[("credit", 1.0), ("layovers", 0.5)])];
        let deltas = BTreeMap::from([("credit".to_string(), 1.0)]);
        retune(&mut candidates, &deltas);
        assert_eq!(candidates[0].soft_breakdown["credit"], 2.0);
        assert_eq!(candidates[0].soft_breakdown["layovers"], 0.5);
        assert_eq!(candidates[0].score, 2.5);
    }

    #[test]
    fn retune_reorders_by_new_score() {
        let mut candidates = vec![
            candidate("low", &[("credit", 0.2)]),
            candidate("high", &[("credit", 0.1)]),
        ];
        let deltas = BTreeMap::from([("credit".to_string(), 10.0)]);
        retune(&mut candidates, &deltas);
        // both scaled by the same factor, order unchanged, but score updated
        assert_eq!(candidates[0].candidate_id, "low");
        assert!(candidates[0].score > candidates[1].score);
    }

    #[test]
    fn negative_delta_cannot_push_weight_below_zero() {
        let mut candidates = vec![candidate("c1", &[("credit", 1.0)])];
        let deltas = BTreeMap::from([("credit".to_string(), -5.0)]);
        retune(&mut candidates, &deltas);
        assert_eq!(candidates[0].soft_breakdown["credit"], 0.0);
    }
}
