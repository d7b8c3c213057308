// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP request/response envelopes for the VectorBid pipeline API (spec §6).
//!
//! These are wire DTOs, not the pipeline's internal types: a handler's job
//! is to translate between the two. The one deliberate interpretation
//! worth calling out is [`FeatureBundleRequest`] — spec §6 describes the
//! request body as `{feature_bundle, K?}`, but a compiled rule pack isn't
//! something a client can usefully serialize. Clients instead send the
//! *inputs* to enrichment (context, already-parsed preferences, and a
//! package id); the orchestrator performs the fan-out itself, exactly as
//! §4.10 says it should.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vb_core::{
    BidLayerArtifact, CandidateSchedule, ContextSnapshot, PackageSummary, PreferenceSchema,
    StrategyDirectives,
};

// ---------------------------------------------------------------------------
// /api/parse_preferences
// ---------------------------------------------------------------------------

/// `POST /api/parse_preferences` request body.
#[derive(Debug, Deserialize)]
pub struct ParsePreferencesRequest {
    /// Free-text bid instructions.
    pub preferences_text: String,
    /// Named bidding persona, if any.
    #[serde(default)]
    pub persona: Option<String>,
    /// Pilot context; required fields beyond `pilot_id`/`airline`/`base`/
    /// `seat`/`equip` are ignored by the parser itself.
    pub context: ContextSnapshot,
}

/// `POST /api/parse_preferences` response body.
#[derive(Debug, Serialize)]
pub struct ParsePreferencesResponse {
    /// The parsed schema.
    pub preference_schema: PreferenceSchema,
    /// Confidence reported by the parser, in `[0, 1]`.
    pub confidence: f64,
    /// Which path produced the schema.
    pub method: vb_core::preference::ParserMethod,
    /// LLM keys that were recognized but not mapped onto a known field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unrecognized: Vec<String>,
}

// ---------------------------------------------------------------------------
// /api/validate_constraints
// ---------------------------------------------------------------------------

/// `POST /api/validate_constraints` request body.
#[derive(Debug, Deserialize)]
pub struct ValidateConstraintsRequest {
    /// Schema to validate.
    pub preference_schema: PreferenceSchema,
    /// Context the schema was parsed for.
    pub context: ContextSnapshot,
}

/// `POST /api/validate_constraints` response body.
#[derive(Debug, Serialize)]
pub struct ValidateConstraintsResponse {
    /// `true` when `hard_violations` is empty.
    pub ok: bool,
    /// Disqualifying problems found without running a candidate search:
    /// a stated hard constraint that cannot be legal under FAR-117 no
    /// matter which pairings are chosen.
    pub hard_violations: Vec<String>,
    /// Advisory-only problems, e.g. a soft-pref name the active rule pack
    /// does not declare (§3 Invariant: unknown names are warnings, not
    /// errors).
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// /api/optimize, /api/optimize/retune
// ---------------------------------------------------------------------------

/// The client-supplied half of a [`vb_optimizer::FeatureBundle`]; the
/// orchestrator resolves the rule pack and bid package server-side.
#[derive(Debug, Deserialize)]
pub struct FeatureBundleRequest {
    /// Pilot context for this request.
    pub ctx: ContextSnapshot,
    /// Already-parsed preferences (typically the output of an earlier
    /// `/api/parse_preferences` call).
    pub preferences: PreferenceSchema,
    /// Content-addressed id of the bid package to search.
    pub package_id: String,
}

/// `POST /api/optimize` request body.
#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    /// Enrichment inputs.
    pub feature_bundle: FeatureBundleRequest,
    /// Number of candidates to return; defaults to
    /// [`vb_optimizer::BeamConfig::default`]'s `top_k`.
    #[serde(default)]
    pub k: Option<usize>,
}

/// `POST /api/optimize` and `POST /api/optimize/retune` response body.
#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    /// Ranked, hard-ok candidates.
    pub candidates: Vec<CandidateSchedule>,
    /// `vb_core::PIPELINE_VERSION` at the time these candidates were
    /// produced, for determinism-sensitive callers (spec §5).
    pub optimizer_version: &'static str,
    /// Set when no rule pack exists for `(airline, month)`: the optimizer
    /// fell back to FAR-117-only baseline checks with neutral weights.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub legacy_mode: bool,
    /// Non-fatal problems surfaced alongside a still-usable result (spec
    /// §7 `ExpressionError`/`rule_pack_missing`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// `POST /api/optimize/retune` request body.
#[derive(Debug, Deserialize)]
pub struct RetuneRequest {
    /// Candidates previously returned by `/api/optimize`.
    pub candidates: Vec<CandidateSchedule>,
    /// Per-soft-rule fractional weight adjustment.
    pub weight_deltas: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// /api/strategy
// ---------------------------------------------------------------------------

/// `POST /api/strategy` request body.
#[derive(Debug, Deserialize)]
pub struct StrategyRequest {
    /// Enrichment inputs (only `ctx`/`preferences` are used; `package_id`
    /// is accepted for symmetry with [`OptimizeRequest`] but ignored).
    pub feature_bundle: FeatureBundleRequest,
    /// Ranked candidates from `/api/optimize`.
    pub candidates: Vec<CandidateSchedule>,
}

/// `POST /api/strategy` response body.
#[derive(Debug, Serialize)]
pub struct StrategyResponse {
    /// Synthesized directives.
    pub directives: StrategyDirectives,
}

// ---------------------------------------------------------------------------
// /api/generate_layers
// ---------------------------------------------------------------------------

/// `POST /api/generate_layers` request body.
#[derive(Debug, Deserialize)]
pub struct GenerateLayersRequest {
    /// Enrichment inputs (`ctx` supplies airline/month/seniority).
    pub feature_bundle: FeatureBundleRequest,
    /// Ranked candidates from `/api/optimize`.
    pub candidates: Vec<CandidateSchedule>,
    /// Directives from `/api/strategy`; computed on the fly if omitted.
    #[serde(default)]
    pub directives: Option<StrategyDirectives>,
}

/// `POST /api/generate_layers` response body.
#[derive(Debug, Serialize)]
pub struct GenerateLayersResponse {
    /// The generated artifact (not yet linted or exported).
    pub artifact: BidLayerArtifact,
}

// ---------------------------------------------------------------------------
// /api/lint
// ---------------------------------------------------------------------------

/// `POST /api/lint` request body.
#[derive(Debug, Deserialize)]
pub struct LintRequest {
    /// Artifact to check.
    pub artifact: BidLayerArtifact,
}

/// `POST /api/lint` response body.
#[derive(Debug, Serialize)]
pub struct LintResponse {
    /// Findings, grouped by severity.
    pub lint: vb_core::layer::LintReport,
}

// ---------------------------------------------------------------------------
// /api/export
// ---------------------------------------------------------------------------

/// `POST /api/export` request body.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    /// Artifact to render and sign.
    pub artifact: BidLayerArtifact,
    /// Request context the export is issued under.
    pub ctx_id: String,
    /// Pilot this export belongs to.
    pub pilot_id: String,
}

/// `POST /api/export` response body.
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    /// Identifier unique to this export.
    pub export_id: String,
    /// Base64-encoded canonical rendering.
    pub bytes: String,
    /// SHA-256 of the canonical rendering.
    pub export_hash: String,
    /// HMAC-SHA256 of the canonical rendering.
    pub signature: String,
    /// When this export was issued.
    pub issued_at: chrono::DateTime<chrono::Utc>,
}

// ---------------------------------------------------------------------------
// /api/ingest
// ---------------------------------------------------------------------------

/// `POST /api/ingest` response body (request is multipart, see
/// [`crate::ingest_handler`]).
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Content-addressed package id.
    pub package_id: String,
    /// Derived summary.
    pub summary: PackageSummary,
}

// ---------------------------------------------------------------------------
// /api/meta/parsers
// ---------------------------------------------------------------------------

/// `GET /api/meta/parsers` response body.
#[derive(Debug, Serialize)]
pub struct ParsersMetaResponse {
    /// File formats the ingestion parser recognizes.
    pub supported_formats: Vec<&'static str>,
    /// Multipart fields `/api/ingest` requires.
    pub required_fields: Vec<&'static str>,
}

// ---------------------------------------------------------------------------
// /api/meta/version
// ---------------------------------------------------------------------------

/// `GET /api/meta/version` response body.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    /// `vb_core::PIPELINE_VERSION`.
    pub pipeline_version: &'static str,
    /// HTTP API version, major.minor.
    pub api_version: String,
}

// ---------------------------------------------------------------------------
// /api/rule-packs
// ---------------------------------------------------------------------------

/// One entry of `GET /api/rule-packs`.
#[derive(Debug, Serialize)]
pub struct RulePackSummary {
    /// Airline code.
    pub airline: String,
    /// Bid month.
    pub month: String,
    /// Pack version.
    pub version: String,
}

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

/// `GET /health` response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: `"ok"` or `"degraded"`.
    pub status: &'static str,
    /// Package store reachability.
    pub storage: &'static str,
    /// Rule-pack directory reachability; also reports the pipeline version.
    pub rulepack_version: &'static str,
    /// Whether an LLM backend is configured (`"enabled"` / `"disabled"`).
    pub llm: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use vb_core::context::Seat;

    fn ctx() -> ContextSnapshot {
        ContextSnapshot {
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
        }
    }

    #[test]
    fn feature_bundle_request_deserializes_from_wire_shape() {
        let body = serde_json::json!({
            "ctx": serde_json::to_value(ctx()).unwrap(),
            "preferences": {
                "pilot_id": "P1",
                "airline": "UAL",
                "base": "DEN",
                "seat": "FO",
                "equip": ["737"],
                "hard_constraints": {
                    "days_off": [],
                    "no_red_eyes": false,
                    "legalities": []
                },
                "soft_prefs": {},
                "weights_version": "v1",
                "confidence": 0.6,
                "source": {"persona": null, "text": "", "parser_method": "rule_based", "unrecognized": []}
            },
            "package_id": "abc123"
        });
        let req: FeatureBundleRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.package_id, "abc123");
        assert_eq!(req.ctx.airline, "UAL");
    }

    #[test]
    fn optimize_response_omits_legacy_mode_when_false() {
        let resp = OptimizeResponse {
            candidates: vec![],
            optimizer_version: vb_core::PIPELINE_VERSION,
            legacy_mode: false,
            warnings: vec![],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("legacy_mode").is_none());
    }

    #[test]
    fn optimize_response_includes_legacy_mode_when_true() {
        let resp = OptimizeResponse {
            candidates: vec![],
            optimizer_version: vb_core::PIPELINE_VERSION,
            legacy_mode: true,
            warnings: vec!["rule_pack_missing".into()],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["legacy_mode"], true);
        assert_eq!(json["warnings"][0], "rule_pack_missing");
    }
}
