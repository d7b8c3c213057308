// SPDX-License-Identifier: MIT OR Apache-2.0
//! Precomputed package-level statistics fed into the rule evaluator's
//! `stats` namespace (spec §4.4), e.g. `stats.avg_credit_minutes`.
//!
//! These are package-derived aggregates rather than a historical award
//! database VectorBid has no access to; a rule pack referencing a stat
//! this module does not produce degrades gracefully to a warn-severity
//! violation, never a hard failure (see `vb_rulepack::facts::stats_namespace`).

use std::collections::BTreeMap;

use vb_core::BidPackage;

/// Compute per-package aggregate statistics: credit/layover/weekend/red-eye
/// rates across every pairing in `package`, keyed to match the rule-pack
/// `stats` namespace.
#[must_use]
pub fn compute_stats(package: &BidPackage) -> BTreeMap<String, f64> {
    let mut stats = BTreeMap::new();
    let n = package.pairings.len();
    if n == 0 {
        return stats;
    }

    let total_credit: u32 = package.pairings.iter().map(|p| p.credit_minutes).sum();
    let total_block: u32 = package.pairings.iter().map(|p| p.block_minutes).sum();
    let red_eye_count = package.pairings.iter().filter(|p| p.has_red_eye).count();
    let weekend_count = package
        .pairings
        .iter()
        .filter(|p| p.includes_weekend)
        .count();

    let layovers: Vec<u32> = package
        .pairings
        .iter()
        .flat_map(|p| p.layovers.iter())
        .map(|l| l.minutes)
        .collect();
    let avg_layover_minutes = if layovers.is_empty() {
        0.0
    } else {
        layovers.iter().sum::<u32>() as f64 / layovers.len() as f64
    };

    stats.insert("trip_count".to_string(), n as f64);
    stats.insert(
        "avg_credit_minutes".to_string(),
        total_credit as f64 / n as f64,
    );
    stats.insert(
        "avg_block_minutes".to_string(),
        total_block as f64 / n as f64,
    );
    stats.insert("avg_layover_minutes".to_string(), avg_layover_minutes);
    stats.insert(
        "red_eye_rate".to_string(),
        red_eye_count as f64 / n as f64,
    );
    stats.insert(
        "weekend_rate".to_string(),
        weekend_count as f64 / n as f64,
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use vb_core::{Pairing, Seat, SourceFormat};

    fn package_with(pairings: Vec<Pairing>) -> BidPackage {
        BidPackage {
            package_id: "pkg1".into(),
            airline: "UAL".into(),
            month: "2025-09".into(),
            base: "DEN".into(),
            fleet: "737".into(),
            seat: Seat::Fo,
            uploaded_at: chrono::Utc::now(),
            source_format: SourceFormat::Csv,
            pairings,
        }
    }

    fn pairing(credit: u32, red_eye: bool, weekend: bool) -> Pairing {
        Pairing {
            pairing_id: format!("P{credit}"),
            days: 3,
            credit_minutes: credit,
            block_minutes: credit - 50,
            routing: vec!["DEN".into()],
            dates: vec![],
            includes_weekend: weekend,
            has_red_eye: red_eye,
            duty_periods: vec![],
            layovers: vec![],
            equipment: "737".into(),
            raw: String::new(),
        }
    }

    #[test]
    fn empty_package_yields_empty_stats() {
        let package = package_with(vec![]);
        assert!(compute_stats(&package).is_empty());
    }

    #[test]
    fn averages_and_rates_are_computed_correctly() {
        let package = package_with(vec![
            pairing(600, true, false),
            pairing(800, false, true),
        ]);
        let stats = compute_stats(&package);
        assert_eq!(stats["trip_count"], 2.0);
        assert_eq!(stats["avg_credit_minutes"], 700.0);
        assert_eq!(stats["red_eye_rate"], 0.5);
        assert_eq!(stats["weekend_rate"], 0.5);
    }
}
