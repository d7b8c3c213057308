// SPDX-License-Identifier: MIT OR Apache-2.0
//! Context Enricher / Feature Fusion (spec §4.4): fans out rule-pack
//! loading, package lookup, and preference parsing concurrently, then
//! fuses the results into one immutable [`FeatureBundle`] the optimizer
//! scores against.

use std::sync::Arc;

use vb_core::{BidPackage, ContextSnapshot, PreferenceSchema};
use vb_ingest::{IngestError, PackageStore};
use vb_prefparse::{ParseRequest, PreferenceParser};
use vb_rulepack::{CompiledRulePack, ContractConstants, Far117Constants, LoadError, RulePackCache};

use crate::analytics;

/// Failure of any one leg of the enrichment fan-out. The other legs are
/// still run to completion (spec §5: "a slow leg never blocks the others
/// from finishing; a failed leg surfaces its own error").
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    /// The rule pack for `(airline, month)` could not be loaded.
    #[error("rule pack unavailable: {0}")]
    RulePack(#[from] LoadError),
    /// The bid package could not be found.
    #[error("bid package unavailable: {0}")]
    Package(#[from] IngestError),
}

/// Everything the optimizer needs to score candidates for one request,
/// assembled once and never mutated (§3 ownership: `FeatureBundle` is
/// built fresh per request, not cached or shared across requests).
pub struct FeatureBundle {
    /// Per-request pilot context.
    pub ctx: ContextSnapshot,
    /// Parsed preferences.
    pub preferences: PreferenceSchema,
    /// The bid package candidates are drawn from.
    pub package: Arc<BidPackage>,
    /// Compiled, evaluable rule pack for this airline/month.
    pub rule_pack: Arc<CompiledRulePack>,
    /// FAR-117 constants in effect.
    pub far117: Far117Constants,
    /// Airline-contract constants in effect.
    pub contract: ContractConstants,
    /// Package-derived historical-style statistics (`stats` namespace).
    pub stats: std::collections::BTreeMap<String, f64>,
}

/// Run the rule-pack load, package lookup, and preference parse
/// concurrently and fuse their results.
///
/// `apply_persona` is left to the caller (`vb-optimizer`'s own
/// `optimize` entry point applies it) so this function stays a pure
/// fan-out/fuse step with no persona-specific branching.
pub async fn enrich(
    rulepack_cache: &RulePackCache,
    package_store: &PackageStore,
    preference_parser: &PreferenceParser,
    ctx: ContextSnapshot,
    package_id: &str,
    pref_request: ParseRequest,
    far117: Far117Constants,
    contract: ContractConstants,
) -> Result<FeatureBundle, EnrichError> {
    let (rule_pack, package, preferences) = tokio::join!(
        rulepack_cache.get(&ctx.airline, &ctx.month),
        package_store.lookup(package_id),
        preference_parser.parse(pref_request),
    );

    let rule_pack = rule_pack?;
    let package = Arc::new(package?);
    let stats = analytics::compute_stats(&package);

    tracing::debug!(
        ctx_id = %ctx.ctx_id,
        package_id,
        pairings = package.pairings.len(),
        rule_pack_version = %rule_pack.meta.version,
        "enrichment fan-out complete",
    );

    Ok(FeatureBundle {
        ctx,
        preferences,
        package,
        rule_pack,
        far117,
        contract,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use vb_core::context::Seat;

    fn write_rule_pack(dir: &std::path::Path) {
        let airline_dir = dir.join("UAL");
        std::fs::create_dir_all(&airline_dir).unwrap();
        let mut f = std::fs::File::create(airline_dir.join("2025-09.yaml")).unwrap();
        f.write_all(
            br#"
meta:
  version: "2025.1"
  airline: UAL
  month: "2025-09"
  expression_dialect: vb-expr/v1
hard_rules: []
soft_rules: []
"#,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn enrich_fuses_all_three_legs() {
        let rp_dir = tempfile::tempdir().unwrap();
        write_rule_pack(rp_dir.path());
        let rulepack_cache = RulePackCache::new(
            vb_rulepack::RulePackLoader::new(rp_dir.path()),
            std::num::NonZeroUsize::new(4).unwrap(),
        );

        let pkg_dir = tempfile::tempdir().unwrap();
        let package_store = PackageStore::new(pkg_dir.path());
        let csv = b"pairing_id,days,credit_minutes,block_minutes,routing,dates,includes_weekend,has_red_eye,equipment\nPR1,3,600,540,DEN;ORD;DEN,,false,false,737\n";
        let package = package_store
            .ingest(
                csv,
                vb_ingest::IngestRequest {
                    airline: "UAL".into(),
                    month: "2025-09".into(),
                    base: "DEN".into(),
                    fleet: "737".into(),
                    seat: Seat::Fo,
                    filename: Some("p.csv".into()),
                },
            )
            .await
            .unwrap();

        let parser = PreferenceParser::new(None);

        let ctx = ContextSnapshot {
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
        };

        let bundle = enrich(
            &rulepack_cache,
            &package_store,
            &parser,
            ctx,
            &package.package_id,
            ParseRequest {
                pilot_id: "P1".into(),
                airline: "UAL".into(),
                month: "2025-09".into(),
                base: "DEN".into(),
                seat: Seat::Fo,
                equip: vec!["737".into()],
                text: "maximize credit".into(),
                persona: None,
                weights_version: "v1".into(),
            },
            Far117Constants::default(),
            ContractConstants::default(),
        )
        .await
        .unwrap();

        assert_eq!(bundle.package.pairings.len(), 1);
        assert!(bundle.preferences.soft_prefs.contains_key("credit"));
        assert_eq!(bundle.stats["trip_count"], 1.0);
    }

    #[tokio::test]
    async fn missing_package_surfaces_its_own_error() {
        let rp_dir = tempfile::tempdir().unwrap();
        write_rule_pack(rp_dir.path());
        let rulepack_cache = RulePackCache::new(
            vb_rulepack::RulePackLoader::new(rp_dir.path()),
            std::num::NonZeroUsize::new(4).unwrap(),
        );
        let pkg_dir = tempfile::tempdir().unwrap();
        let package_store = PackageStore::new(pkg_dir.path());
        let parser = PreferenceParser::new(None);

        let ctx = ContextSnapshot {
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
        };

        let err = enrich(
            &rulepack_cache,
            &package_store,
            &parser,
            ctx,
            "missing-hash",
            ParseRequest {
                pilot_id: "P1".into(),
                airline: "UAL".into(),
                month: "2025-09".into(),
                base: "DEN".into(),
                seat: Seat::Fo,
                equip: vec!["737".into()],
                text: String::new(),
                persona: None,
                weights_version: "v1".into(),
            },
            Far117Constants::default(),
            ContractConstants::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EnrichError::Package(_)));
    }
}
