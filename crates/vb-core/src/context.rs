// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ephemeral per-request pilot context.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flight-deck seat position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Seat {
    /// First Officer.
    Fo,
    /// Captain.
    Ca,
}

/// Pilot and request context assembled by the Context Enricher.
///
/// Created once per request and immutable for the remainder of the request
/// (§3 Ownership).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContextSnapshot {
    /// Unique identifier for this request.
    pub ctx_id: String,
    /// Pilot the request is on behalf of.
    pub pilot_id: String,
    /// Airline code, e.g. `"UAL"`.
    pub airline: String,
    /// Bid month, `YYYY-MM`.
    pub month: String,
    /// Domicile base airport code.
    pub base: String,
    /// Seat position.
    pub seat: Seat,
    /// Ordered set of qualified equipment codes.
    pub equip: Vec<String>,
    /// Seniority percentile within base/seat/equip, in `[0, 1]`.
    pub seniority_percentile: f64,
    /// Free-form commuting attributes (e.g. `home` airport).
    #[serde(default)]
    pub commuting_profile: BTreeMap<String, serde_json::Value>,
    /// Default soft-rule weights, used when no rule pack overrides them.
    #[serde(default)]
    pub default_weights: BTreeMap<String, f64>,
}

impl ContextSnapshot {
    /// Clamp `seniority_percentile` into `[0, 1]` in place.
    pub fn normalize(&mut self) {
        self.seniority_percentile = self.seniority_percentile.clamp(0.0, 1.0);
    }
}
