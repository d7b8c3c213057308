// SPDX-License-Identifier: MIT OR Apache-2.0
//! Request validation for the VectorBid HTTP API.
//!
//! Most request shapes are enforced by `serde` at the `Json<T>` extractor
//! boundary; this module covers what a type alone cannot: bounds on
//! free-text fields, and a depth/size guard over the open-ended
//! `serde_json::Value` fields a rule pack or client can populate
//! (`SoftPref::target`), so a pathologically nested or oversized value
//! never reaches the expression evaluator or the layer canonicalizer.

use vb_core::preference::PreferenceSchema;
use vb_core::ContextSnapshot;

/// Maximum allowed length for free-text bid instructions.
const MAX_PREFERENCES_TEXT_LENGTH: usize = 20_000;

/// Validates incoming API requests before they reach a handler's pipeline
/// calls.
pub struct RequestValidator;

impl RequestValidator {
    /// Validate a context snapshot's required identity fields.
    pub fn validate_context(ctx: &ContextSnapshot) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if ctx.pilot_id.trim().is_empty() {
            errors.push("ctx.pilot_id must not be empty".into());
        }
        if ctx.airline.trim().is_empty() {
            errors.push("ctx.airline must not be empty".into());
        }
        if ctx.base.trim().is_empty() {
            errors.push("ctx.base must not be empty".into());
        }
        if !(0.0..=1.0).contains(&ctx.seniority_percentile) {
            errors.push("ctx.seniority_percentile must be in [0, 1]".into());
        }
        if ctx.month.len() != 7 || ctx.month.as_bytes().get(4) != Some(&b'-') {
            errors.push("ctx.month must be in YYYY-MM form".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate free-text preference instructions before they are handed to
    /// the rule-based prefilter or redacted into an LLM prompt.
    pub fn validate_preferences_text(text: &str) -> Result<(), String> {
        if text.len() > MAX_PREFERENCES_TEXT_LENGTH {
            Err(format!(
                "preferences_text exceeds maximum length of {MAX_PREFERENCES_TEXT_LENGTH} characters"
            ))
        } else {
            Ok(())
        }
    }

    /// Validate a parsed schema's open-ended fields: each `SoftPref::target`
    /// is guarded against excessive nesting/size, and `weight`/`confidence`
    /// are checked against their documented ranges.
    pub fn validate_preference_schema(schema: &PreferenceSchema) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(0.0..=1.0).contains(&schema.confidence) {
            errors.push("confidence must be in [0, 1]".into());
        }

        for (name, pref) in &schema.soft_prefs {
            if !(0.0..=1.0).contains(&pref.weight) {
                errors.push(format!("soft_prefs.{name}.weight must be in [0, 1]"));
            }
            if let Some(target) = &pref.target {
                for err in validate_json_value(target, JsonGuardLimits::default()) {
                    errors.push(format!("soft_prefs.{name}.target: {err}"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Bounds for [`validate_json_value`].
#[derive(Debug, Clone, Copy)]
pub struct JsonGuardLimits {
    /// Maximum nesting depth across objects and arrays.
    pub max_depth: usize,
    /// Maximum serialized size in bytes.
    pub max_size_bytes: usize,
}

impl JsonGuardLimits {
    /// Construct explicit limits.
    #[must_use]
    pub fn new(max_depth: usize, max_size_bytes: usize) -> Self {
        Self {
            max_depth,
            max_size_bytes,
        }
    }
}

impl Default for JsonGuardLimits {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_size_bytes: 16_384,
        }
    }
}

/// Check `value` against `limits`, returning every violation found rather
/// than failing fast on the first one.
#[must_use]
pub fn validate_json_value(value: &serde_json::Value, limits: JsonGuardLimits) -> Vec<String> {
    let mut errors = Vec::new();

    let size = serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0);
    if size > limits.max_size_bytes {
        errors.push(format!(
            "value serializes to {size} bytes, exceeding the {} byte limit",
            limits.max_size_bytes
        ));
    }

    let depth = json_depth(value);
    if depth > limits.max_depth {
        errors.push(format!(
            "value nests {depth} levels deep, exceeding the {} level limit",
            limits.max_depth
        ));
    }

    errors
}

fn json_depth(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Object(map) => {
            1 + map.values().map(json_depth).max().unwrap_or(0)
        }
        serde_json::Value::Array(items) => {
            1 + items.iter().map(json_depth).max().unwrap_or(0)
        }
        _ => 0,
    }
}
