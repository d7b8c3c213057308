// SPDX-License-Identifier: MIT OR Apache-2.0
//! PII redaction helpers shared by logging and the LLM adapter.
//!
//! Two redaction strategies are offered: structural (field-name based, for
//! JSON payloads we control the shape of) and textual (token scanning, for
//! free-form preference text sent to an LLM). Neither attempts to be a
//! general PII detector; both are narrowly scoped to the fields VectorBid
//! actually handles (emails, full names, pilot ids).

use sha2::{Digest, Sha256};

/// Field names (case-insensitive) treated as carrying PII in structured
/// payloads.
const PII_FIELD_NAMES: &[&str] = &[
    "email",
    "name",
    "full_name",
    "first_name",
    "last_name",
    "pilot_id",
    "phone",
];

/// `true` if `key` is a known PII-carrying field name.
#[must_use]
pub fn is_pii_field(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    PII_FIELD_NAMES.iter().any(|f| *f == lower)
}

/// Deterministic, irreversible stand-in for a PII value, stable across
/// calls so the same value always redacts to the same token (useful for
/// correlating log lines without storing the original).
#[must_use]
pub fn hash_pii(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("redacted:{:.12x}", hasher.finalize())
}

/// Recursively walk a JSON value, replacing the value of any object key
/// that `is_pii_field` with its `hash_pii` form. Arrays and nested objects
/// are walked; scalars at non-PII keys are left untouched.
pub fn redact_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if is_pii_field(key) {
                    if let Some(s) = v.as_str() {
                        *v = serde_json::Value::String(hash_pii(s));
                        continue;
                    }
                }
                redact_json(v);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                redact_json(item);
            }
        }
        _ => {}
    }
}

/// Redact email-like tokens from free text before it leaves the process
/// (e.g. in an outbound LLM prompt or a log line). A token is treated as
/// email-like if it contains exactly one `@` with non-whitespace on both
/// sides.
#[must_use]
pub fn redact_text_emails(text: &str) -> String {
    text.split_whitespace()
        .map(|tok| {
            let at_count = tok.bytes().filter(|b| *b == b'@').count();
            if at_count == 1 && !tok.starts_with('@') && !tok.ends_with('@') {
                "[redacted-email]"
            } else {
                tok
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_pii_is_deterministic() {
        assert_eq!(hash_pii("jane@example.com"), hash_pii("jane@example.com"));
    }

    #[test]
    fn redact_json_replaces_known_fields_only() {
        let mut v = json!({
            "pilot_id": "P12345",
            "base": "DEN",
            "nested": { "email": "jane@example.com" },
        });
        redact_json(&mut v);
        assert!(v["pilot_id"].as_str().unwrap().starts_with("redacted:"));
        assert_eq!(v["base"], json!("DEN"));
        assert!(v["nested"]["email"]
            .as_str()
            .unwrap()
            .starts_with("redacted:"));
    }

    #[test]
    fn redact_text_emails_masks_email_tokens_only() {
        let out = redact_text_emails("contact jane@example.com about DEN base");
        assert_eq!(out, "contact [redacted-email] about DEN base");
    }
}
