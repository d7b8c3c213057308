// SPDX-License-Identifier: MIT OR Apache-2.0
//! Prompt construction and tolerant parsing of the LLM's preference JSON.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;
use vb_core::preference::{HardConstraints, PrefDirection, SoftPref, SoftPrefKind};

/// Instruction prefix sent ahead of the redacted context/text, describing
/// the JSON shape expected back.
pub const INSTRUCTION: &str = r#"Extract structured pilot bid preferences from the text below. \
Respond with a single JSON object with this shape, omitting fields you are unsure about: \
{"hard_constraints": {"days_off": ["YYYY-MM-DD"], "no_red_eyes": bool, "max_duty_hours_per_day": number}, \
"soft_prefs": {"<name>": {"kind": "pairing_length|layovers|credit|weekend_priority|international|commuting", \
"direction": "prefer|avoid", "weight": number between 0 and 1}}, "confidence": number between 0 and 1}"#;

/// Parsed fragments pulled out of an LLM response, tolerant of missing or
/// malformed fields. Unrecognized soft-pref kind strings become
/// `SoftPrefKind::Extension` rather than being dropped.
pub struct ParsedResponse {
    /// Hard constraints recovered from the response.
    pub hard_constraints: HardConstraints,
    /// Soft preferences recovered from the response.
    pub soft_prefs: BTreeMap<String, SoftPref>,
    /// Self-reported confidence, clamped to `[0, 1]`.
    pub confidence: Option<f64>,
    /// Top-level keys present in the response this parser does not
    /// understand at all.
    pub unrecognized: Vec<String>,
}

fn parse_direction(s: &str) -> PrefDirection {
    match s {
        "avoid" => PrefDirection::Avoid,
        _ => PrefDirection::Prefer,
    }
}

fn parse_kind(name: &str, s: &str) -> SoftPrefKind {
    match s {
        "pairing_length" => SoftPrefKind::PairingLength,
        "layovers" => SoftPrefKind::Layovers,
        "credit" => SoftPrefKind::Credit,
        "weekend_priority" => SoftPrefKind::WeekendPriority,
        "international" => SoftPrefKind::International,
        "commuting" => SoftPrefKind::Commuting,
        _ => SoftPrefKind::Extension {
            name: name.to_string(),
        },
    }
}

/// Parse a best-effort `Value` into a [`ParsedResponse`]. Never fails: any
/// field that does not match the expected shape is simply omitted and, for
/// top-level keys, recorded in `unrecognized`.
#[must_use]
pub fn parse_response(value: &Value) -> ParsedResponse {
    let mut hard_constraints = HardConstraints::default();
    let mut soft_prefs = BTreeMap::new();
    let mut unrecognized = Vec::new();
    let mut confidence = None;

    let Some(obj) = value.as_object() else {
        return ParsedResponse {
            hard_constraints,
            soft_prefs,
            confidence,
            unrecognized: vec!["<non-object response>".to_string()],
        };
    };

    for key in obj.keys() {
        if !matches!(key.as_str(), "hard_constraints" | "soft_prefs" | "confidence") {
            unrecognized.push(key.clone());
        }
    }

    if let Some(hc) = obj.get("hard_constraints").and_then(Value::as_object) {
        if let Some(days) = hc.get("days_off").and_then(Value::as_array) {
            for d in days {
                if let Some(s) = d.as_str() {
                    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                        hard_constraints.days_off.insert(date);
                    }
                }
            }
        }
        if let Some(b) = hc.get("no_red_eyes").and_then(Value::as_bool) {
            hard_constraints.no_red_eyes = b;
        }
        if let Some(n) = hc.get("max_duty_hours_per_day").and_then(Value::as_u64) {
            hard_constraints.max_duty_hours_per_day = Some(n as u32);
        }
        if let Some(legalities) = hc.get("legalities").and_then(Value::as_array) {
            for l in legalities {
                if let Some(s) = l.as_str() {
                    hard_constraints.legalities.insert(s.to_string());
                }
            }
        }
    }

    if let Some(prefs) = obj.get("soft_prefs").and_then(Value::as_object) {
        for (name, entry) in prefs {
            let Some(entry) = entry.as_object() else {
                continue;
            };
            let kind_str = entry.get("kind").and_then(Value::as_str).unwrap_or("");
            let direction = entry
                .get("direction")
                .and_then(Value::as_str)
                .map(parse_direction)
                .unwrap_or(PrefDirection::Prefer);
            let weight = entry
                .get("weight")
                .and_then(Value::as_f64)
                .unwrap_or(0.5)
                .clamp(0.0, 1.0);
            soft_prefs.insert(
                name.clone(),
                SoftPref {
                    kind: parse_kind(name, kind_str),
                    direction,
                    target: entry.get("target").cloned(),
                    weight,
                },
            );
        }
    }

    if let Some(c) = obj.get("confidence").and_then(Value::as_f64) {
        confidence = Some(c.clamp(0.0, 1.0));
    }

    ParsedResponse {
        hard_constraints,
        soft_prefs,
        confidence,
        unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response() {
        let value = serde_json::json!({
            "hard_constraints": {"no_red_eyes": true, "days_off": ["2025-09-01"]},
            "soft_prefs": {"credit": {"kind": "credit", "direction": "prefer", "weight": 0.8}},
            "confidence": 0.9,
        });
        let parsed = parse_response(&value);
        assert!(parsed.hard_constraints.no_red_eyes);
        assert_eq!(parsed.hard_constraints.days_off.len(), 1);
        assert_eq!(parsed.soft_prefs.len(), 1);
        assert_eq!(parsed.confidence, Some(0.9));
        assert!(parsed.unrecognized.is_empty());
    }

    #[test]
    fn unknown_soft_pref_kind_becomes_extension() {
        let value = serde_json::json!({
            "soft_prefs": {"weird": {"kind": "not_a_real_kind", "direction": "prefer", "weight": 0.4}},
        });
        let parsed = parse_response(&value);
        let pref = parsed.soft_prefs.get("weird").unwrap();
        assert!(matches!(pref.kind, SoftPrefKind::Extension { .. }));
    }

    #[test]
    fn unrecognized_top_level_keys_are_tracked() {
        let value = serde_json::json!({"mood": "optimistic"});
        let parsed = parse_response(&value);
        assert_eq!(parsed.unrecognized, vec!["mood".to_string()]);
    }

    #[test]
    fn non_object_response_is_handled_gracefully() {
        let parsed = parse_response(&serde_json::json!("just a string"));
        assert!(parsed.soft_prefs.is_empty());
        assert_eq!(parsed.unrecognized.len(), 1);
    }
}
