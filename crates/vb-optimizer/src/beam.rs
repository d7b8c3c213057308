// SPDX-License-Identifier: MIT OR Apache-2.0
//! Width-limited beam search over pairing subsets (spec §4.5).
//!
//! Pairings that individually violate a hard rule are pruned before the
//! search starts. Each surviving subset is visited at most once, keyed by
//! its sorted pairing-id vector, so reordering never re-explores a
//! state. Scoring couples a candidate's rule-pack soft-rule breakdown with
//! the pilot's named soft preferences: a preference whose name matches a
//! soft rule scales that rule's contribution; an unmatched rule keeps a
//! neutral multiplier of `1.0`.

use std::collections::{BTreeMap, BTreeSet};

use vb_core::preference::PrefDirection;
use vb_core::{CandidateSchedule, CandidateState, Pairing};
use vb_rulepack::{build_bindings, evaluate_hard, score_soft};

use crate::enrich::FeatureBundle;

/// Tunables for the search; defaults favor a breadth that stays cheap
/// enough to run inline inside an HTTP handler.
#[derive(Debug, Clone, Copy)]
pub struct BeamConfig {
    /// Number of states kept after each expansion round.
    pub width: usize,
    /// Maximum pairings a candidate may contain.
    pub max_pairings: usize,
    /// Number of top candidates returned.
    pub top_k: usize,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            width: 40,
            max_pairings: 6,
            top_k: 10,
        }
    }
}

fn preference_multiplier(bundle: &FeatureBundle, rule_name: &str) -> f64 {
    match bundle.preferences.soft_prefs.get(rule_name) {
        None => 1.0,
        Some(pref) => match pref.direction {
            PrefDirection::Prefer => (1.0 + pref.weight).max(0.0),
            PrefDirection::Avoid => (1.0 - pref.weight).max(0.0),
        },
    }
}

fn score_candidate(
    bundle: &FeatureBundle,
    candidate: &mut CandidateSchedule,
) -> bool {
    let bindings = build_bindings(
        &bundle.ctx,
        candidate,
        &bundle.package.pairings,
        bundle.far117,
        &bundle.contract,
        &bundle.stats,
    );
    let hard = evaluate_hard(&bundle.rule_pack, &bindings);
    let raw_breakdown = score_soft(&bundle.rule_pack, &bindings);

    let breakdown: BTreeMap<String, f64> = raw_breakdown
        .into_iter()
        .map(|(name, value)| {
            let scaled = value * preference_multiplier(bundle, &name);
            (name, scaled)
        })
        .collect();

    candidate.hard_ok = hard.hard_ok();
    candidate.violations = hard.violations;
    candidate.legal_explanation = hard.hits;
    candidate.score = breakdown.values().sum();
    candidate.soft_breakdown = breakdown;
    candidate.state = CandidateState::Scored;
    candidate.hard_ok
}

fn build_candidate(bundle: &FeatureBundle, pairing_ids: &[String]) -> CandidateSchedule {
    let candidate_id = CandidateSchedule::compute_id(
        &bundle.ctx.ctx_id,
        pairing_ids,
        &bundle.preferences.weights_version,
        &bundle.rule_pack.meta.version,
    );
    CandidateSchedule {
        candidate_id,
        state: CandidateState::Constructed,
        pairings: pairing_ids.to_vec(),
        score: 0.0,
        hard_ok: false,
        soft_breakdown: BTreeMap::new(),
        violations: vec![],
        rationale: vec![],
        legal_explanation: vec![],
    }
}

fn rationale_for(candidate: &CandidateSchedule) -> Vec<String> {
    let mut entries: Vec<(&String, &f64)> = candidate.soft_breakdown.iter().collect();
    entries.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap());
    entries
        .into_iter()
        .take(5)
        .map(|(name, value)| {
            if *value >= 0.0 {
                format!("{name} contributed +{value:.3}")
            } else {
                format!("{name} contributed {value:.3}")
            }
        })
        .collect()
}

fn individually_eligible(bundle: &FeatureBundle, pairing: &Pairing) -> bool {
    let mut candidate = build_candidate(bundle, std::slice::from_ref(&pairing.pairing_id));
    score_candidate(bundle, &mut candidate)
}

/// Run the beam search, returning up to `config.top_k` hard-ok candidates
/// ranked by score descending, ties broken by fewer violations then by
/// `candidate_id` for full determinism.
#[must_use]
pub fn search(bundle: &FeatureBundle, config: &BeamConfig) -> Vec<CandidateSchedule> {
    let eligible_ids: Vec<String> = bundle
        .package
        .pairings
        .iter()
        .filter(|p| individually_eligible(bundle, p))
        .map(|p| p.pairing_id.clone())
        .collect();

    if eligible_ids.is_empty() {
        return Vec::new();
    }

    let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
    let mut collected: Vec<CandidateSchedule> = Vec::new();
    let mut beam: Vec<Vec<String>> = vec![Vec::new()];

    for _ in 0..config.max_pairings {
        let mut expanded: Vec<CandidateSchedule> = Vec::new();

        for state in &beam {
            for id in &eligible_ids {
                if state.contains(id) {
                    continue;
                }
                let mut next = state.clone();
                next.push(id.clone());
                let mut sorted = next.clone();
                sorted.sort_unstable();
                if !seen.insert(sorted) {
                    continue;
                }

                let mut candidate = build_candidate(bundle, &next);
                if score_candidate(bundle, &mut candidate) {
                    expanded.push(candidate);
                }
            }
        }

        if expanded.is_empty() {
            break;
        }

        expanded.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        expanded.truncate(config.width);

        beam = expanded.iter().map(|c| c.pairings.clone()).collect();
        collected.extend(expanded);
    }

    collected.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap()
            .then_with(|| a.violations.len().cmp(&b.violations.len()))
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });
    collected.truncate(config.top_k);

    for candidate in &mut collected {
        candidate.rationale = rationale_for(candidate);
        candidate.state = CandidateState::Ranked;
    }

    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::FeatureBundle;
    use std::sync::Arc;
    use vb_core::context::Seat;
    use vb_core::preference::{HardConstraints, ParserMethod, PreferenceSchema, PreferenceSource, SoftPref, SoftPrefKind};
    use vb_core::{BidPackage, ContextSnapshot, DutyPeriod, Layover, SourceFormat};
    use vb_rulepack::{CompiledRulePack, ContractConstants, Far117Constants};

    fn pairing(id: &str, credit: u32, red_eye: bool) -> Pairing {
        Pairing {
            pairing_id: id.to_string(),
            days: 2,
            credit_minutes: credit,
            block_minutes: credit - 30,
            routing: vec!["DEN".into(), "ORD".into()],
            dates: vec![],
            includes_weekend: false,
            has_red_eye: red_eye,
            duty_periods: vec![DutyPeriod {
                report: 700,
                release: 1500,
                duty_minutes: 480,
                rest_before_minutes: Some(700),
            }],
            layovers: vec![Layover {
                airport: "ORD".into(),
                minutes: 600,
            }],
            equipment: "737".into(),
            raw: String::new(),
        }
    }

    fn bundle_with(pack_yaml: &str, pairings: Vec<Pairing>, soft_prefs: BTreeMap<String, SoftPref>) -> FeatureBundle {
        let def: vb_core::RulePackDef = serde_yaml::from_str(pack_yaml).unwrap();
        let rule_pack = Arc::new(CompiledRulePack::compile(def).unwrap());
        let package = Arc::new(BidPackage {
            package_id: "pkg1".into(),
            airline: "UAL".into(),
            month: "2025-09".into(),
            base: "DEN".into(),
            fleet: "737".into(),
            seat: Seat::Fo,
            uploaded_at: chrono::Utc::now(),
            source_format: SourceFormat::Csv,
            pairings,
        });
        FeatureBundle {
            ctx: ContextSnapshot {
                ctx_id: "ctx-1".into(),
                pilot_id: "P1".into(),
                airline: "UAL".into(),
                month: "2025-09".into(),
                base: "DEN".into(),
                seat: Seat::Fo,
                equip: vec!["737".into()],
                seniority_percentile: 0.5,
                commuting_profile: Default::default(),
                default_weights: Default::default(),
            },
            preferences: PreferenceSchema {
                pilot_id: "P1".into(),
                airline: "UAL".into(),
                base: "DEN".into(),
                seat: Seat::Fo,
                equip: vec!["737".into()],
                hard_constraints: HardConstraints::default(),
                soft_prefs,
                weights_version: "v1".into(),
                confidence: 0.9,
                source: PreferenceSource {
                    persona: None,
                    text: String::new(),
                    parser_method: ParserMethod::RuleBased,
                    unrecognized: vec![],
                },
            },
            package,
            rule_pack,
            far117: Far117Constants::default(),
            contract: ContractConstants::default(),
            stats: BTreeMap::new(),
        }
    }

    const PACK: &str = r#"
meta:
  version: "2025.1"
  airline: UAL
  month: "2025-09"
  expression_dialect: vb-expr/v1
hard_rules:
  - id: no_red_eye_for_beam
    description: beam search should drop red-eye pairings here
    severity: error
    check: "candidate.red_eye_count == 0"
soft_rules:
  - name: credit
    description: prefer higher credit
    score: "candidate.credit_minutes / 2000"
    weight: 1.0
"#;

    #[test]
    fn drops_individually_invalid_pairings() {
        let bundle = bundle_with(
            PACK,
            vec![pairing("P1", 600, false), pairing("P2", 900, true)],
            BTreeMap::new(),
        );
        let results = search(&bundle, &BeamConfig::default());
        assert!(results.iter().all(|c| !c.pairings.contains(&"P2".to_string())));
    }

    #[test]
    fn ranks_higher_credit_first_when_preferred() {
        let mut prefs = BTreeMap::new();
        prefs.insert(
            "credit".to_string(),
            SoftPref {
                kind: SoftPrefKind::Credit,
                direction: PrefDirection::Prefer,
                target: None,
                weight: 0.9,
            },
        );
        let bundle = bundle_with(
            PACK,
            vec![pairing("P1", 600, false), pairing("P3", 1200, false)],
            prefs,
        );
        let results = search(&bundle, &BeamConfig::default());
        assert!(!results.is_empty());
        assert!(results[0].pairings.contains(&"P3".to_string()));
    }

    #[test]
    fn every_returned_candidate_is_hard_ok() {
        let bundle = bundle_with(
            PACK,
            vec![pairing("P1", 600, false), pairing("P2", 900, true)],
            BTreeMap::new(),
        );
        let results = search(&bundle, &BeamConfig::default());
        assert!(results.iter().all(CandidateSchedule::is_eligible));
    }

    #[test]
    fn empty_package_yields_no_candidates() {
        let bundle = bundle_with(PACK, vec![], BTreeMap::new());
        assert!(search(&bundle, &BeamConfig::default()).is_empty());
    }
}
