// SPDX-License-Identifier: MIT OR Apache-2.0
//! Builds evaluator [`Bindings`] from the `vb-core` data model.

use crate::value::{Bindings, Namespace, Value};
use chrono::Datelike;
use vb_core::{CandidateSchedule, ContextSnapshot, Pairing, Seat};

/// FAR-117 constants used by the `far117` namespace. Airline contracts may
/// be more restrictive than the federal floor; `contract` carries those.
#[derive(Debug, Clone, Copy)]
pub struct Far117Constants {
    /// Minimum rest required before a duty period, in minutes.
    pub min_rest_minutes: u32,
    /// Maximum scheduled duty length in a single day, in minutes.
    pub max_duty_minutes_per_day: u32,
    /// Maximum flight-duty-period minutes in a rolling 7-day window.
    pub max_duty_minutes_per_week: u32,
}

impl Default for Far117Constants {
    fn default() -> Self {
        Self {
            min_rest_minutes: 600,
            max_duty_minutes_per_day: 16 * 60,
            max_duty_minutes_per_week: 60 * 60,
        }
    }
}

/// Airline-contract-derived constants, loaded alongside (but distinct from)
/// the rule pack's own hard/soft declarations.
#[derive(Debug, Clone, Default)]
pub struct ContractConstants {
    /// Maximum consecutive pairings allowed before a mandatory day off.
    pub max_consecutive_pairings: Option<u32>,
}

/// Build the `context` namespace from a `ContextSnapshot`.
#[must_use]
pub fn context_namespace(ctx: &ContextSnapshot) -> Namespace {
    let mut ns = Namespace::new()
        .with("pilot_id", Value::Str(ctx.pilot_id.clone()))
        .with("airline", Value::Str(ctx.airline.clone()))
        .with("month", Value::Str(ctx.month.clone()))
        .with("base", Value::Str(ctx.base.clone()))
        .with(
            "seat",
            Value::Str(match ctx.seat {
                Seat::Fo => "FO".to_string(),
                Seat::Ca => "CA".to_string(),
            }),
        )
        .with(
            "seniority_percentile",
            Value::Number(ctx.seniority_percentile),
        )
        .with(
            "equip",
            Value::List(ctx.equip.iter().cloned().map(Value::Str).collect()),
        );
    for (k, v) in &ctx.commuting_profile {
        if let Some(val) = json_to_value(v) {
            ns = ns.with(format!("commuting_profile.{k}"), val);
        }
    }
    ns
}

/// Build the `candidate` namespace: aggregate scalars derived from the
/// candidate's member pairings. The optimizer computes these once per
/// candidate; the evaluator never re-derives them.
#[must_use]
pub fn candidate_namespace(pairings: &[&Pairing]) -> Namespace {
    let credit_minutes: u32 = pairings.iter().map(|p| p.credit_minutes).sum();
    let block_minutes: u32 = pairings.iter().map(|p| p.block_minutes).sum();
    let days: u32 = pairings.iter().map(|p| p.days).sum();
    let pairings_count = pairings.len() as f64;
    let weekend_count = pairings.iter().filter(|p| p.includes_weekend).count() as f64;
    let red_eye_count = pairings.iter().filter(|p| p.has_red_eye).count() as f64;
    let layover_minutes_total: u32 = pairings
        .iter()
        .flat_map(|p| p.layovers.iter())
        .map(|l| l.minutes)
        .sum();

    Namespace::new()
        .with("credit_minutes", Value::Number(credit_minutes as f64))
        .with("block_minutes", Value::Number(block_minutes as f64))
        .with("days", Value::Number(days as f64))
        .with("pairings_count", Value::Number(pairings_count))
        .with("weekend_pairings_count", Value::Number(weekend_count))
        .with("red_eye_count", Value::Number(red_eye_count))
        .with(
            "layover_minutes_total",
            Value::Number(layover_minutes_total as f64),
        )
}

/// Build the `pairing` namespace: flattened per-field lists gathered across
/// every member pairing, enabling aggregate expressions like
/// `min(pairing.rest_before_minutes) >= far117.min_rest_minutes`.
#[must_use]
pub fn pairing_namespace(pairings: &[&Pairing]) -> Namespace {
    let rest_before_minutes: Vec<Value> = pairings
        .iter()
        .flat_map(|p| p.duty_periods.iter())
        .filter_map(|d| d.rest_before_minutes)
        .map(|m| Value::Number(m as f64))
        .collect();
    let reports: Vec<Value> = pairings
        .iter()
        .flat_map(|p| p.duty_periods.iter())
        .map(|d| Value::Number(d.report as f64))
        .collect();
    let releases: Vec<Value> = pairings
        .iter()
        .flat_map(|p| p.duty_periods.iter())
        .map(|d| Value::Number(d.release as f64))
        .collect();
    let duty_minutes: Vec<Value> = pairings
        .iter()
        .flat_map(|p| p.duty_periods.iter())
        .map(|d| Value::Number(d.duty_minutes as f64))
        .collect();
    let dates: Vec<Value> = pairings
        .iter()
        .flat_map(|p| p.dates.iter())
        .map(|d| Value::Str(d.format("%Y-%m-%d").to_string()))
        .collect();
    let has_red_eye: Vec<Value> = pairings
        .iter()
        .map(|p| Value::Bool(p.has_red_eye))
        .collect();
    let includes_weekend: Vec<Value> = pairings
        .iter()
        .map(|p| Value::Bool(p.includes_weekend))
        .collect();

    Namespace::new()
        .with("rest_before_minutes", Value::List(rest_before_minutes))
        .with("report", Value::List(reports))
        .with("release", Value::List(releases))
        .with("duty_minutes", Value::List(duty_minutes))
        .with("dates", Value::List(dates))
        .with("has_red_eye", Value::List(has_red_eye))
        .with("includes_weekend", Value::List(includes_weekend))
}

/// Build the `far117` namespace.
#[must_use]
pub fn far117_namespace(c: Far117Constants) -> Namespace {
    Namespace::new()
        .with("min_rest_minutes", Value::Number(c.min_rest_minutes as f64))
        .with(
            "max_duty_minutes_per_day",
            Value::Number(c.max_duty_minutes_per_day as f64),
        )
        .with(
            "max_duty_minutes_per_week",
            Value::Number(c.max_duty_minutes_per_week as f64),
        )
}

/// Build the `contract` namespace.
#[must_use]
pub fn contract_namespace(c: &ContractConstants) -> Namespace {
    let mut ns = Namespace::new();
    if let Some(max) = c.max_consecutive_pairings {
        ns = ns.with("max_consecutive_pairings", Value::Number(max as f64));
    }
    ns
}

/// Build the `stats` namespace from an open map of precomputed historical
/// statistics. Absent keys resolve to `EvalError::UndefinedIdent`, which
/// the evaluator surfaces as a `warn`-severity rule violation, never a hard
/// failure (spec §4.6 "absent stats -> a calibrated prior").
#[must_use]
pub fn stats_namespace(stats: &std::collections::BTreeMap<String, f64>) -> Namespace {
    let mut ns = Namespace::new();
    for (k, v) in stats {
        ns = ns.with(k.clone(), Value::Number(*v));
    }
    ns
}

/// Assemble the full [`Bindings`] for evaluating hard/soft rules against one
/// candidate's member pairings in one request context.
#[must_use]
pub fn build_bindings(
    ctx: &ContextSnapshot,
    candidate: &CandidateSchedule,
    package_pairings: &[Pairing],
    far117: Far117Constants,
    contract: &ContractConstants,
    stats: &std::collections::BTreeMap<String, f64>,
) -> Bindings {
    let members: Vec<&Pairing> = candidate
        .pairings
        .iter()
        .filter_map(|id| package_pairings.iter().find(|p| &p.pairing_id == id))
        .collect();

    Bindings {
        context: context_namespace(ctx),
        candidate: candidate_namespace(&members),
        pairing: pairing_namespace(&members),
        far117: far117_namespace(far117),
        contract: contract_namespace(contract),
        stats: stats_namespace(stats),
    }
}

fn json_to_value(v: &serde_json::Value) -> Option<Value> {
    match v {
        serde_json::Value::String(s) => Some(Value::Str(s.clone())),
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        _ => None,
    }
}

/// Weekday index (`0 = Monday`) for a date, used by rule packs that embed
/// weekend logic outside the `dow()` DSL function (e.g. precomputing
/// `Pairing.includes_weekend` at ingestion time).
#[must_use]
pub fn is_weekend(date: chrono::NaiveDate) -> bool {
    matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn context_namespace_maps_seat_to_far117_code() {
        let ctx = ContextSnapshot {
            ctx_id: "c1".into(),
            pilot_id: "P1".into(),
            airline: "UAL".into(),
            month: "2025-09".into(),
            base: "DEN".into(),
            seat: Seat::Ca,
            equip: vec!["737".into()],
            seniority_percentile: 0.5,
            commuting_profile: BTreeMap::new(),
            default_weights: BTreeMap::new(),
        };
        let ns = context_namespace(&ctx);
        assert_eq!(ns.get("seat"), Some(&Value::Str("CA".into())));
    }

    #[test]
    fn is_weekend_detects_saturday_and_sunday() {
        let sat = chrono::NaiveDate::from_ymd_opt(2025, 9, 6).unwrap();
        let mon = chrono::NaiveDate::from_ymd_opt(2025, 9, 8).unwrap();
        assert!(is_weekend(sat));
        assert!(!is_weekend(mon));
    }
}
