// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared command implementations for the VectorBid CLI.
//!
//! These functions are library-level so they can be tested without
//! spawning the binary.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;

use anyhow::{Context, Result};
use schemars::schema_for;

use vb_core::context::{ContextSnapshot, Seat};
use vb_core::layer::BidLayerArtifact;
use vb_core::{BidPackage, CandidateSchedule, PreferenceSchema, RulePackDef};
use vb_export::{Signer, export};
use vb_ingest::{IngestRequest, PackageStore};
use vb_linter::{KNOWN_FILTER_TYPES, lint};
use vb_optimizer::enrich::enrich;
use vb_optimizer::{BeamConfig, optimize};
use vb_prefparse::{ParseRequest, PreferenceParser};
use vb_rulepack::{ContractConstants, Far117Constants, RulePackCache, RulePackLoader};
use vb_strategy::{build_strategy, generate_layers};

use crate::format::{Formatter, OutputFormat};

/// Schema types that can be printed by the `schema` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// JSON schema for [`BidPackage`].
    Package,
    /// JSON schema for [`RulePackDef`].
    RulePack,
    /// JSON schema for [`PreferenceSchema`].
    Preferences,
    /// JSON schema for [`CandidateSchedule`].
    Candidate,
    /// JSON schema for [`BidLayerArtifact`].
    Artifact,
}

/// Return the JSON schema string for the given kind.
pub fn schema_json(kind: SchemaKind) -> Result<String> {
    let value = match kind {
        SchemaKind::Package => serde_json::to_value(schema_for!(BidPackage))?,
        SchemaKind::RulePack => serde_json::to_value(schema_for!(RulePackDef))?,
        SchemaKind::Preferences => serde_json::to_value(schema_for!(PreferenceSchema))?,
        SchemaKind::Candidate => serde_json::to_value(schema_for!(CandidateSchedule))?,
        SchemaKind::Artifact => serde_json::to_value(schema_for!(BidLayerArtifact))?,
    };
    serde_json::to_string_pretty(&value).context("serialize schema")
}

/// Ingest a file from disk into the package store and return its summary.
pub async fn ingest_file(
    packages_dir: &Path,
    file: &Path,
    request: IngestRequest,
) -> Result<BidPackage> {
    let bytes =
        std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let store = PackageStore::new(packages_dir);
    store
        .ingest(&bytes, request)
        .await
        .with_context(|| format!("ingesting {}", file.display()))
}

/// Load and compile a rule-pack YAML file directly (not via the cache),
/// for one-off `validate`/`show` operations on a single file.
pub fn load_rule_pack_file(file: &Path) -> Result<vb_rulepack::CompiledRulePack> {
    let text =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let def: RulePackDef = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing {} as a rule pack", file.display()))?;
    vb_rulepack::CompiledRulePack::compile(def)
        .with_context(|| format!("compiling rule pack {}", file.display()))
}

/// List `(airline, month)` rule packs found under `root`, where the layout
/// is `{root}/{airline}/{month}.yaml`.
pub fn list_rule_packs(root: &Path) -> Result<Vec<(String, String)>> {
    let mut found = Vec::new();
    if !root.is_dir() {
        return Ok(found);
    }
    for airline_entry in std::fs::read_dir(root)? {
        let airline_entry = airline_entry?;
        if !airline_entry.file_type()?.is_dir() {
            continue;
        }
        let airline = airline_entry.file_name().to_string_lossy().into_owned();
        for month_entry in std::fs::read_dir(airline_entry.path())? {
            let month_entry = month_entry?;
            let path = month_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(month) = path.file_stem().and_then(|s| s.to_str()) {
                found.push((airline.clone(), month.to_string()));
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Parse free-text preferences via the rule-based prefilter (no LLM
/// adapter configured in the CLI context, matching spec §4.3's
/// "always falls back to the rule-based prefilter" guarantee).
pub async fn parse_preferences(request: ParseRequest) -> PreferenceSchema {
    let parser = PreferenceParser::new(None);
    parser.parse(request).await
}

/// Inputs shared by `optimize` and `bid`: everything needed to run the
/// Context Enricher / Feature Fusion step (spec §4.4) against a locally
/// stored package and rule pack.
pub struct PipelineInputs {
    /// Package store root.
    pub packages_dir: std::path::PathBuf,
    /// Rule-pack root.
    pub rule_packs_dir: std::path::PathBuf,
    /// Id of the already-ingested package to optimize against.
    pub package_id: String,
    /// Pilot context for this request.
    pub ctx: ContextSnapshot,
    /// Free-text preference request.
    pub pref_request: ParseRequest,
}

/// Run the enrich → optimize pipeline end to end against local stores,
/// returning the ranked candidates, the fused preferences, and the
/// package-derived stats (needed downstream by `build_strategy`).
pub async fn run_optimize(
    inputs: PipelineInputs,
    beam_config: &BeamConfig,
) -> Result<(Vec<CandidateSchedule>, PreferenceSchema, BTreeMap<String, f64>)> {
    let loader = RulePackLoader::new(&inputs.rule_packs_dir);
    let rulepack_cache = RulePackCache::new(loader, NonZeroUsize::new(16).unwrap());
    let package_store = PackageStore::new(&inputs.packages_dir);
    let preference_parser = PreferenceParser::new(None);

    let bundle = enrich(
        &rulepack_cache,
        &package_store,
        &preference_parser,
        inputs.ctx,
        &inputs.package_id,
        inputs.pref_request,
        Far117Constants::default(),
        ContractConstants::default(),
    )
    .await
    .context("enriching context/package/preferences")?;

    let stats = bundle.stats.clone();
    let preferences = bundle.preferences.clone();
    let candidates = optimize(bundle, beam_config);
    Ok((candidates, preferences, stats))
}

/// Build strategy directives, generate a numbered layer artifact, and lint
/// it, mirroring the pipeline's Strategist → Layer Generator → Linter
/// sequence (spec §4.6/§4.7).
pub fn build_and_lint_artifact(
    ctx: &ContextSnapshot,
    preferences: &PreferenceSchema,
    stats: &BTreeMap<String, f64>,
    candidates: &[CandidateSchedule],
) -> BidLayerArtifact {
    let directives = build_strategy(&preferences.soft_prefs, stats, candidates.first());
    let mut artifact = generate_layers(
        ctx,
        ctx.airline.clone(),
        ctx.month.clone(),
        directives.layer_templates,
        stats,
    );
    artifact.lint = lint(&artifact, KNOWN_FILTER_TYPES);
    artifact
}

/// Export a rendered artifact: sign it and return `(rendered_bytes,
/// export_record)`.
pub fn export_artifact(
    artifact: &BidLayerArtifact,
    secret: &[u8],
    export_id: String,
    ctx_id: String,
    pilot_id: String,
) -> Result<(String, vb_core::ExportRecord)> {
    let signer = Signer::new(secret.to_vec()).context("building HMAC signer")?;
    export(artifact, &signer, export_id, ctx_id, pilot_id, chrono::Utc::now())
        .context("rendering/signing export")
}

/// Parse a `Seat` from a case-insensitive `fo`/`ca` string, matching the
/// clap `--seat` argument's accepted values.
pub fn parse_seat(s: &str) -> Result<Seat> {
    match s.to_ascii_uppercase().as_str() {
        "FO" => Ok(Seat::Fo),
        "CA" => Ok(Seat::Ca),
        other => anyhow::bail!("unknown seat '{other}', expected FO or CA"),
    }
}

/// Build the formatter for a command, defaulting to human-readable text.
pub fn formatter(format: &str) -> Result<Formatter> {
    let parsed: OutputFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    Ok(Formatter::new(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_seat_accepts_either_case() {
        assert_eq!(parse_seat("fo").unwrap(), Seat::Fo);
        assert_eq!(parse_seat("CA").unwrap(), Seat::Ca);
    }

    #[test]
    fn parse_seat_rejects_unknown() {
        assert!(parse_seat("xx").is_err());
    }

    #[test]
    fn schema_json_package_produces_valid_json() {
        let s = schema_json(SchemaKind::Package).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert!(parsed.is_object());
    }

    #[test]
    fn list_rule_packs_finds_nested_yaml_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("UAL")).unwrap();
        std::fs::write(dir.path().join("UAL/2025-09.yaml"), "meta: {}").unwrap();
        let found = list_rule_packs(dir.path()).unwrap();
        assert_eq!(found, vec![("UAL".to_string(), "2025-09".to_string())]);
    }

    #[test]
    fn list_rule_packs_on_missing_dir_is_empty() {
        let found = list_rule_packs(Path::new("/does/not/exist")).unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn ingest_file_reads_and_stores_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("pairings.csv");
        std::fs::write(
            &csv_path,
            b"pairing_id,days,credit_minutes,block_minutes,routing,dates,includes_weekend,has_red_eye,equipment\nPR1,3,600,540,DEN;ORD;DEN,,false,false,737\n",
        )
        .unwrap();
        let package = ingest_file(
            dir.path(),
            &csv_path,
            IngestRequest {
                airline: "UAL".into(),
                month: "2025-09".into(),
                base: "DEN".into(),
                fleet: "737".into(),
                seat: Seat::Fo,
                filename: Some("pairings.csv".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(package.pairings.len(), 1);
    }
}
