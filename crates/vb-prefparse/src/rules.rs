// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rule-based prefilter: a fixed keyword vocabulary that turns free-text
//! bid instructions into a [`PreferenceSchema`] without any LLM call. This
//! is both the parser's baseline (always run first, cheaply) and its
//! terminal fallback when every LLM backend has failed.

use std::collections::BTreeMap;

use chrono::Datelike;
use vb_core::preference::{HardConstraints, PrefDirection, SoftPref, SoftPrefKind};

/// One vocabulary entry: a phrase to look for, the soft-pref name it maps
/// to, its direction, and the base weight applied when it matches.
struct Keyword {
    phrase: &'static str,
    name: &'static str,
    kind: SoftPrefKind,
    direction: PrefDirection,
    weight: f64,
}

fn vocabulary() -> Vec<Keyword> {
    vec![
        Keyword {
            phrase: "high credit",
            name: "credit",
            kind: SoftPrefKind::Credit,
            direction: PrefDirection::Prefer,
            weight: 0.8,
        },
        Keyword {
            phrase: "maximize credit",
            name: "credit",
            kind: SoftPrefKind::Credit,
            direction: PrefDirection::Prefer,
            weight: 0.9,
        },
        Keyword {
            phrase: "max credit",
            name: "credit",
            kind: SoftPrefKind::Credit,
            direction: PrefDirection::Prefer,
            weight: 0.9,
        },
        Keyword {
            phrase: "avoid long layovers",
            name: "layovers",
            kind: SoftPrefKind::Layovers,
            direction: PrefDirection::Avoid,
            weight: 0.7,
        },
        Keyword {
            phrase: "short layovers",
            name: "layovers",
            kind: SoftPrefKind::Layovers,
            direction: PrefDirection::Prefer,
            weight: 0.6,
        },
        Keyword {
            phrase: "senior pairings",
            name: "pairing_length",
            kind: SoftPrefKind::PairingLength,
            direction: PrefDirection::Prefer,
            weight: 0.6,
        },
        Keyword {
            phrase: "junior-friendly",
            name: "pairing_length",
            kind: SoftPrefKind::PairingLength,
            direction: PrefDirection::Avoid,
            weight: 0.6,
        },
        Keyword {
            phrase: "junior friendly",
            name: "pairing_length",
            kind: SoftPrefKind::PairingLength,
            direction: PrefDirection::Avoid,
            weight: 0.6,
        },
        Keyword {
            phrase: "weekends off",
            name: "weekend_priority",
            kind: SoftPrefKind::WeekendPriority,
            direction: PrefDirection::Prefer,
            weight: 0.7,
        },
        Keyword {
            phrase: "international",
            name: "international",
            kind: SoftPrefKind::International,
            direction: PrefDirection::Prefer,
            weight: 0.5,
        },
        Keyword {
            phrase: "domestic only",
            name: "international",
            kind: SoftPrefKind::International,
            direction: PrefDirection::Avoid,
            weight: 0.7,
        },
        Keyword {
            phrase: "easy commute",
            name: "commuting",
            kind: SoftPrefKind::Commuting,
            direction: PrefDirection::Prefer,
            weight: 0.6,
        },
        Keyword {
            phrase: "late report",
            name: "commuting",
            kind: SoftPrefKind::Commuting,
            direction: PrefDirection::Prefer,
            weight: 0.5,
        },
    ]
}

/// Phrases that name a concept the pipeline cannot represent as a soft
/// preference (they describe a bid strategy, not a schedule feature).
/// Recorded in `source.unrecognized` rather than silently dropped.
const RESERVED_PHRASES: &[&str] = &["no reserve", "line holder"];

/// Result of the keyword pass: the soft prefs it found, any hard
/// constraints it could extract, and phrases it recognized but could not
/// map to a soft preference.
pub struct RuleBasedResult {
    /// Extracted soft preferences, keyed by name.
    pub soft_prefs: BTreeMap<String, SoftPref>,
    /// Extracted hard constraints.
    pub hard_constraints: HardConstraints,
    /// Recognized-but-unmappable phrases, to surface rather than drop.
    pub unrecognized: Vec<String>,
}

/// Phrases that ask to exclude red-eye pairings entirely.
const RED_EYE_PHRASES: &[&str] = &[
    "no red eye",
    "no red-eye",
    "no redeyes",
    "avoid red eye",
    "avoid red-eye",
    "avoid redeyes",
];

/// Phrases that ask to keep Saturdays and Sundays free.
const WEEKEND_OFF_PHRASES: &[&str] = &["weekends off", "weekend off"];

/// Every Saturday and Sunday in `month` (`YYYY-MM`), or an empty set if
/// `month` does not parse — callers always have a well-formed month by the
/// time free text reaches this function (§3 `ContextSnapshot.month`), so a
/// malformed value degrades to "no dates extracted" rather than panicking.
fn weekend_dates_in_month(month: &str) -> std::collections::BTreeSet<chrono::NaiveDate> {
    let mut dates = std::collections::BTreeSet::new();
    let Some((year, mon)) = month.split_once('-') else {
        return dates;
    };
    let (Ok(year), Ok(mon)) = (year.parse::<i32>(), mon.parse::<u32>()) else {
        return dates;
    };
    let Some(mut date) = chrono::NaiveDate::from_ymd_opt(year, mon, 1) else {
        return dates;
    };
    while date.month() == mon {
        if vb_rulepack::facts::is_weekend(date) {
            dates.insert(date);
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    dates
}

/// Scan `text` for known phrases and assemble soft prefs, hard
/// constraints, and a list of recognized reserved-namespace phrases.
/// `month` (`YYYY-MM`) is used to expand a "weekends off" hit into the
/// concrete Saturdays/Sundays that must go in `hard_constraints.days_off`.
#[must_use]
pub fn extract(text: &str, month: &str) -> RuleBasedResult {
    let lower = text.to_ascii_lowercase();
    let mut soft_prefs = BTreeMap::new();

    for kw in vocabulary() {
        if lower.contains(kw.phrase) {
            soft_prefs.insert(
                kw.name.to_string(),
                SoftPref {
                    kind: kw.kind,
                    direction: kw.direction,
                    target: None,
                    weight: kw.weight,
                },
            );
        }
    }

    let mut unrecognized = Vec::new();
    for phrase in RESERVED_PHRASES {
        if lower.contains(phrase) {
            unrecognized.push((*phrase).to_string());
        }
    }

    let mut hard_constraints = HardConstraints::default();
    if RED_EYE_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        hard_constraints.no_red_eyes = true;
    }
    if WEEKEND_OFF_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        hard_constraints.days_off.extend(weekend_dates_in_month(month));
    }

    RuleBasedResult {
        soft_prefs,
        hard_constraints,
        unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_credit_phrase_to_prefer_credit() {
        let result = extract("I want to maximize credit this month", "2025-09");
        let pref = result.soft_prefs.get("credit").unwrap();
        assert_eq!(pref.direction, PrefDirection::Prefer);
    }

    #[test]
    fn no_red_eye_sets_hard_constraint() {
        let result = extract("Please, no red-eye trips", "2025-09");
        assert!(result.hard_constraints.no_red_eyes);
    }

    #[test]
    fn avoid_red_eyes_phrasing_sets_hard_constraint() {
        let result = extract(
            "weekends off, prefer morning departures, avoid red-eyes",
            "2025-09",
        );
        assert!(result.hard_constraints.no_red_eyes);
    }

    #[test]
    fn weekends_off_fills_days_off_with_every_weekend_day_in_month() {
        let result = extract("I want weekends off please", "2025-09");
        // September 2025 has 8 Saturdays/Sundays (6,7,13,14,20,21,27,28).
        assert_eq!(result.hard_constraints.days_off.len(), 8);
        let first = chrono::NaiveDate::from_ymd_opt(2025, 9, 6).unwrap();
        let last = chrono::NaiveDate::from_ymd_opt(2025, 9, 28).unwrap();
        assert!(result.hard_constraints.days_off.contains(&first));
        assert!(result.hard_constraints.days_off.contains(&last));
    }

    #[test]
    fn reserved_phrase_is_recorded_not_mapped() {
        let result = extract("I am a line holder, no reserve please", "2025-09");
        assert!(result.soft_prefs.is_empty());
        assert!(result.unrecognized.contains(&"line holder".to_string()));
        assert!(result.unrecognized.contains(&"no reserve".to_string()));
    }

    #[test]
    fn unmatched_text_yields_empty_result() {
        let result = extract("whatever works for me", "2025-09");
        assert!(result.soft_prefs.is_empty());
        assert!(result.unrecognized.is_empty());
    }

    #[test]
    fn malformed_month_yields_no_days_off() {
        let result = extract("weekends off please", "not-a-month");
        assert!(result.hard_constraints.days_off.is_empty());
    }
}
