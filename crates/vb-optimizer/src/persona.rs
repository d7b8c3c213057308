// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persona multipliers: a named bidding style scales a pilot's soft-pref
//! weights before the beam search runs, without touching the rule pack
//! itself (spec §4.3 supplemental vocabulary).

use std::collections::BTreeMap;

use vb_core::preference::{SoftPref, SoftPrefKind};

fn multiplier(persona: &str, kind: &SoftPrefKind) -> f64 {
    match (persona, kind) {
        ("family_first", SoftPrefKind::WeekendPriority) => 1.5,
        ("family_first", SoftPrefKind::Commuting) => 1.3,
        ("family_first", SoftPrefKind::Credit) => 0.8,
        ("money_maker", SoftPrefKind::Credit) => 1.6,
        ("money_maker", SoftPrefKind::WeekendPriority) => 0.7,
        ("money_maker", SoftPrefKind::PairingLength) => 1.2,
        ("commuter", SoftPrefKind::Commuting) => 1.8,
        ("commuter", SoftPrefKind::Layovers) => 0.8,
        ("commuter", SoftPrefKind::International) => 0.7,
        _ => 1.0,
    }
}

/// Scale `soft_prefs` in place by the named persona's multiplier table,
/// then renormalize weights to sum to `1.0` (no-op when `persona` is
/// `None` or the map is empty/all-zero).
pub fn apply(soft_prefs: &mut BTreeMap<String, SoftPref>, persona: Option<&str>) {
    let Some(persona) = persona else {
        return;
    };

    for pref in soft_prefs.values_mut() {
        pref.weight = (pref.weight * multiplier(persona, &pref.kind)).clamp(0.0, f64::MAX);
    }

    let total: f64 = soft_prefs.values().map(|p| p.weight).sum();
    if total > 0.0 {
        for pref in soft_prefs.values_mut() {
            pref.weight /= total;
        }
    }
}
