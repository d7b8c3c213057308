// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parsed trips ("pairings").

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single duty period within a pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DutyPeriod {
    /// Report time, minutes since midnight UTC on the duty day.
    pub report: u32,
    /// Release time, minutes since midnight UTC on the duty day.
    pub release: u32,
    /// Scheduled duty length in minutes.
    pub duty_minutes: u32,
    /// Rest preceding this duty period, in minutes. `None` for the first
    /// duty period of a pairing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_before_minutes: Option<u32>,
}

/// A layover between duty periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Layover {
    /// Airport code of the layover station.
    pub airport: String,
    /// Layover length in minutes.
    pub minutes: u32,
}

/// A multi-day trip as a unit the pilot bids on.
///
/// Produced once by ingestion and stored in the bid-package store;
/// immutable thereafter. `BidPackage` owns pairings directly; every other
/// structure that refers to one does so by `pairing_id` or by index into
/// `BidPackage::pairings`, never by copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Pairing {
    /// Identifier unique within the owning bid package.
    pub pairing_id: String,
    /// Number of calendar days the pairing spans.
    pub days: u32,
    /// Total scheduled credit in minutes.
    pub credit_minutes: u32,
    /// Total scheduled block time in minutes.
    pub block_minutes: u32,
    /// Ordered routing, e.g. `["DEN", "ORD", "DEN"]`.
    pub routing: Vec<String>,
    /// Ordered calendar dates the pairing occupies.
    pub dates: Vec<NaiveDate>,
    /// Whether the pairing includes a Saturday or Sunday.
    pub includes_weekend: bool,
    /// Whether any duty period is a red-eye.
    pub has_red_eye: bool,
    /// Duty periods in chronological order.
    pub duty_periods: Vec<DutyPeriod>,
    /// Layovers in chronological order.
    pub layovers: Vec<Layover>,
    /// Qualified equipment this pairing is flown on.
    pub equipment: String,
    /// Opaque original source text or bytes, preserved for audit and for
    /// fields the parser did not recognize.
    pub raw: String,
}

impl Pairing {
    /// Sum of all duty period durations, in minutes.
    #[must_use]
    pub fn duty_minutes_total(&self) -> u32 {
        self.duty_periods.iter().map(|d| d.duty_minutes).sum()
    }

    /// `true` if every duty period's preceding rest meets or exceeds
    /// `far117_min_rest` minutes (duty periods with no preceding rest, i.e.
    /// the first of the pairing, are not evaluated here).
    #[must_use]
    pub fn rest_ok(&self, far117_min_rest: u32) -> bool {
        self.duty_periods
            .iter()
            .filter_map(|d| d.rest_before_minutes)
            .all(|rest| rest >= far117_min_rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairing() -> Pairing {
        Pairing {
            pairing_id: "PX1".into(),
            days: 3,
            credit_minutes: 900,
            block_minutes: 840,
            routing: vec!["DEN".into(), "ORD".into(), "DEN".into()],
            dates: vec![],
            includes_weekend: false,
            has_red_eye: false,
            duty_periods: vec![
                DutyPeriod {
                    report: 480,
                    release: 960,
                    duty_minutes: 480,
                    rest_before_minutes: None,
                },
                DutyPeriod {
                    report: 480,
                    release: 900,
                    duty_minutes: 420,
                    rest_before_minutes: Some(600),
                },
            ],
            layovers: vec![Layover {
                airport: "ORD".into(),
                minutes: 720,
            }],
            equipment: "737".into(),
            raw: "raw-line".into(),
        }
    }

    #[test]
    fn duty_minutes_total_sums_all_periods() {
        assert_eq!(pairing().duty_minutes_total(), 900);
    }

    #[test]
    fn rest_ok_checks_only_periods_with_preceding_rest() {
        let p = pairing();
        assert!(p.rest_ok(600));
        assert!(!p.rest_ok(601));
    }
}
