// SPDX-License-Identifier: MIT OR Apache-2.0
#![warn(missing_docs)]
//! Pipeline orchestrator and HTTP surface for VectorBid (spec §4, §6).
//!
//! [`AppState`] holds every shared, long-lived dependency (caches, stores,
//! the LLM adapter, the export signer); [`build_app`] wires them into the
//! Axum router. Handlers translate [`api`] DTOs to and from the pipeline
//! crates' own types — the orchestrator itself has no business logic of
//! its own, only fan-out and translation.

pub mod api;
pub mod error;
pub mod middleware;
pub mod validation;
pub mod versioning;

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::error_handling::HandleErrorLayer;
use axum::extract::{DefaultBodyLimit, Multipart, Path as AxumPath, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower::BoxError;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::warn;
use vb_core::context::Seat;
use vb_core::BidPackage;
use vb_error::{ErrorCode, VbError};
use vb_export::{AuditStore, Signer};
use vb_ingest::PackageStore;
use vb_llm::LlmAdapter;
use vb_optimizer::{BeamConfig, FeatureBundle};
use vb_prefparse::{ParseRequest, PreferenceParser};
use vb_retry::health::{HealthMonitor, HealthStatus};
use vb_rulepack::{ContractConstants, Far117Constants, RulePackCache, RulePackLoader};

use crate::api::*;
use crate::error::ApiError;
use crate::middleware::{request_id_middleware, RequestLogger};

/// Shared application state, constructed once at startup and cloned (as an
/// `Arc`) into every request.
pub struct AppState {
    /// Loaded configuration.
    pub config: vb_config::VbConfig,
    /// Compiled rule-pack cache.
    pub rulepack_cache: RulePackCache,
    /// Rule-pack loader used for raw-YAML listing endpoints, sharing the
    /// same root as `rulepack_cache`.
    pub rulepack_loader: RulePackLoader,
    /// Content-addressed bid-package store.
    pub package_store: PackageStore,
    /// Preference parser (LLM-primary, rule-based-fallback).
    pub preference_parser: PreferenceParser,
    /// Append-only export audit trail. `None` until `export_signing_secret`
    /// is configured, at which point `/api/export` is disabled entirely.
    pub audit_store: Option<AuditStore>,
    /// Export signer. `None` disables `/api/export`.
    pub signer: Option<Signer>,
    /// Beam search tunables.
    pub beam_config: BeamConfig,
    /// FAR-117 constants applied to every enrichment.
    pub far117: Far117Constants,
    /// Airline-contract constants applied to every enrichment.
    pub contract: ContractConstants,
    /// When this process started, for `/health` uptime reporting.
    pub started_at: Instant,
    /// Rolling health history for `/health`'s subsystem breakdown.
    pub health: tokio::sync::Mutex<HealthMonitor>,
}

impl AppState {
    /// Build application state from a loaded [`vb_config::VbConfig`].
    ///
    /// `audit_store`/`signer` are only populated when
    /// `export_signing_secret` is set; `/api/export` returns
    /// [`ErrorCode::ExportFailed`] until an operator configures one.
    pub fn new(config: vb_config::VbConfig) -> Result<Self, anyhow::Error> {
        let rulepack_loader = RulePackLoader::new(&config.rule_packs_dir);
        let capacity = NonZeroUsize::new(config.rule_pack_cache_capacity as usize)
            .unwrap_or(NonZeroUsize::new(1).unwrap());
        let rulepack_cache = RulePackCache::new(rulepack_loader.clone(), capacity);
        let package_store = PackageStore::new(&config.packages_dir);

        let llm_config = vb_llm::LlmConfig::default()
            .with_primary_timeout(Duration::from_millis(config.llm_primary_timeout_ms))
            .with_secondary_timeout(Duration::from_millis(config.llm_secondary_timeout_ms));
        let primary_backend = config.llm_primary_key.as_ref().map(|key| {
            Arc::new(vb_llm::HttpLlmBackend::new(
                reqwest::Client::new(),
                "https://api.anthropic.com/v1/messages".to_string(),
                key.clone(),
                config
                    .llm_primary_model
                    .clone()
                    .unwrap_or_else(|| "claude-3-5-sonnet-latest".to_string()),
            )) as Arc<dyn vb_llm::LlmBackend>
        });
        let secondary_backend = config.llm_secondary_key.as_ref().map(|key| {
            Arc::new(vb_llm::HttpLlmBackend::new(
                reqwest::Client::new(),
                "https://api.anthropic.com/v1/messages".to_string(),
                key.clone(),
                config
                    .llm_secondary_model
                    .clone()
                    .unwrap_or_else(|| "claude-3-haiku-latest".to_string()),
            )) as Arc<dyn vb_llm::LlmBackend>
        });
        let adapter = if primary_backend.is_some() || secondary_backend.is_some() {
            Some(Arc::new(LlmAdapter::new(
                llm_config,
                primary_backend,
                secondary_backend,
            )))
        } else {
            None
        };
        let preference_parser = PreferenceParser::new(adapter);

        let (audit_store, signer) = match &config.export_signing_secret {
            Some(secret) => {
                let signer = Signer::new(secret.clone().into_bytes())
                    .map_err(|e| anyhow::anyhow!("invalid export signing secret: {e}"))?;
                let audit_path = PathBuf::from(&config.packages_dir)
                    .parent()
                    .unwrap_or_else(|| std::path::Path::new("."))
                    .join("export_audit.sqlite3");
                let audit_store = AuditStore::open(audit_path)?;
                (Some(audit_store), Some(signer))
            }
            None => (None, None),
        };

        Ok(Self {
            config,
            rulepack_cache,
            rulepack_loader,
            package_store,
            preference_parser,
            audit_store,
            signer,
            beam_config: BeamConfig::default(),
            far117: Far117Constants::default(),
            contract: ContractConstants::default(),
            started_at: Instant::now(),
            health: tokio::sync::Mutex::new(HealthMonitor::new()),
        })
    }
}

/// Translate a [`tower::timeout::error::Elapsed`] (from the deadline layer
/// below) into the `{error: {code: DEADLINE_EXCEEDED}, ...}` envelope spec
/// §5/§7 require; any other boxed error becomes an opaque `Internal` (these
/// never originate from application code, only from the tower stack).
async fn handle_deadline_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::new(VbError::new(
            ErrorCode::DeadlineExceeded,
            "request exceeded the configured deadline; partial results discarded",
        ))
        .into_response()
    } else {
        ApiError::new(VbError::new(ErrorCode::Internal, format!("unhandled tower error: {err}")))
            .into_response()
    }
}

/// Build the Axum router for the VectorBid HTTP API (spec §6).
///
/// Wraps the whole route tree in a per-request deadline (spec §5: "the
/// orchestrator applies an overall request deadline whose expiry cancels
/// all outstanding sub-tasks"). `axum`/`tower` enforce this by dropping the
/// handler's future at the timeout, which cancels every `.await` point
/// inside it — including sub-tasks fanned out with `tokio::join!` — without
/// any handler needing to poll a cancellation token itself.
pub fn build_app(state: Arc<AppState>) -> Router {
    let deadline = Duration::from_millis(state.config.request_deadline_ms);
    Router::new()
        .route("/health", get(health_handler))
        .route("/ping", get(|| async { "pong" }))
        .route("/api/parse_preferences", post(parse_preferences_handler))
        .route(
            "/api/validate_constraints",
            post(validate_constraints_handler),
        )
        .route("/api/optimize", post(optimize_handler))
        .route("/api/optimize/retune", post(retune_handler))
        .route("/api/strategy", post(strategy_handler))
        .route("/api/generate_layers", post(generate_layers_handler))
        .route("/api/lint", post(lint_handler))
        .route("/api/export", post(export_handler))
        .route("/api/ingest", post(ingest_handler))
        .route("/api/meta/parsers", get(parsers_meta_handler))
        .route("/api/meta/version", get(version_handler))
        .route("/api/rule-packs", get(list_rule_packs_handler))
        .route(
            "/api/rule-packs/{airline}/{month}",
            get(get_rule_pack_handler),
        )
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .layer(axum::middleware::from_fn(RequestLogger::layer))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_deadline_error))
                .timeout(deadline),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let storage_ok = tokio::fs::metadata(&state.config.packages_dir).await.is_ok();
    let storage = if storage_ok { "ok" } else { "missing" };
    let llm_enabled = state.config.llm_primary_key.is_some();

    let mut monitor = state.health.lock().await;
    monitor.record_check(
        "package_store",
        if storage_ok {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy {
                reason: "packages directory is not reachable".to_string(),
            }
        },
        None,
    );
    // A missing rule-pack directory falls back to the legacy FAR-117
    // baseline rather than failing, so its absence is not degradation.
    // Configured-off is likewise not a health problem for the LLM adapter;
    // `llm` below reports enabled/disabled separately. Only a live call
    // failure would mark either subsystem unhealthy.
    monitor.record_check("rulepack_store", HealthStatus::Healthy, None);
    monitor.record_check("llm_adapter", HealthStatus::Healthy, None);
    let report = monitor.generate_report();
    let status = match report.overall {
        HealthStatus::Healthy => "ok",
        HealthStatus::Degraded { .. } => "degraded",
        HealthStatus::Unhealthy { .. } => "unhealthy",
        HealthStatus::Unknown => "unknown",
    };

    Json(HealthResponse {
        status,
        storage,
        rulepack_version: vb_core::PIPELINE_VERSION,
        llm: if llm_enabled { "enabled" } else { "disabled" },
    })
}

// ---------------------------------------------------------------------------
// /api/parse_preferences
// ---------------------------------------------------------------------------

async fn parse_preferences_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ParsePreferencesRequest>,
) -> Result<Json<ParsePreferencesResponse>, ApiError> {
    crate::validation::RequestValidator::validate_context(&req.context)
        .map_err(|errors| bad_input(errors.join("; ")))?;
    crate::validation::RequestValidator::validate_preferences_text(&req.preferences_text)
        .map_err(bad_input)?;

    let ctx = &req.context;
    let parse_request = ParseRequest {
        pilot_id: ctx.pilot_id.clone(),
        airline: ctx.airline.clone(),
        month: ctx.month.clone(),
        base: ctx.base.clone(),
        seat: ctx.seat,
        equip: ctx.equip.clone(),
        text: req.preferences_text,
        persona: req.persona,
        weights_version: vb_core::PIPELINE_VERSION.to_string(),
    };
    let schema = state.preference_parser.parse(parse_request).await;
    let unrecognized = schema.source.unrecognized.clone();
    let confidence = schema.confidence;
    let method = schema.source.parser_method;
    Ok(Json(ParsePreferencesResponse {
        preference_schema: schema,
        confidence,
        method,
        unrecognized,
    }))
}

fn bad_input(message: impl Into<String>) -> ApiError {
    ApiError::new(VbError::new(ErrorCode::BadInputMalformedBody, message.into()))
}

// ---------------------------------------------------------------------------
// /api/validate_constraints
// ---------------------------------------------------------------------------

async fn validate_constraints_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateConstraintsRequest>,
) -> Result<Json<ValidateConstraintsResponse>, ApiError> {
    crate::validation::RequestValidator::validate_context(&req.context)
        .map_err(|errors| bad_input(errors.join("; ")))?;

    let mut hard_violations = Vec::new();
    let mut warnings = crate::validation::RequestValidator::validate_preference_schema(
        &req.preference_schema,
    )
    .err()
    .unwrap_or_default();

    if let Some(max_hours) = req.preference_schema.hard_constraints.max_duty_hours_per_day {
        let max_minutes = max_hours.saturating_mul(60);
        if max_minutes > state.far117.max_duty_minutes_per_day {
            hard_violations.push(format!(
                "max_duty_hours_per_day ({max_hours}h) exceeds the FAR-117 daily duty ceiling ({}h)",
                state.far117.max_duty_minutes_per_day / 60
            ));
        }
    }

    for tag in &req.preference_schema.hard_constraints.legalities {
        if tag != "FAR117" {
            warnings.push(format!("unrecognized legality tag '{tag}'"));
        }
    }

    match state
        .rulepack_cache
        .get(&req.context.airline, &req.context.month)
        .await
    {
        Ok(pack) => {
            let declared = pack.soft_rule_names();
            for name in req.preference_schema.unknown_soft_prefs(&declared) {
                warnings.push(format!("unrecognized soft preference '{name}'"));
            }
        }
        Err(_) => {
            warnings.push(
                "no rule pack found for this airline/month; only reserved-namespace soft preferences are recognized"
                    .to_string(),
            );
        }
    }

    Ok(Json(ValidateConstraintsResponse {
        ok: hard_violations.is_empty(),
        hard_violations,
        warnings,
    }))
}

// ---------------------------------------------------------------------------
// Shared: resolve a FeatureBundleRequest into a real FeatureBundle
// ---------------------------------------------------------------------------

/// Resolve a client-supplied [`FeatureBundleRequest`] into a real
/// [`FeatureBundle`], degrading to a rule-pack-free baseline (FAR-117 hard
/// checks only, no soft scoring) when no pack exists for the requested
/// `(airline, month)` rather than failing the whole request (spec §7).
async fn resolve_feature_bundle(
    state: &AppState,
    req: FeatureBundleRequest,
) -> Result<(FeatureBundle, bool, Vec<String>), ApiError> {
    crate::validation::RequestValidator::validate_context(&req.ctx)
        .map_err(|errors| bad_input(errors.join("; ")))?;

    let package = state
        .package_store
        .lookup(&req.package_id)
        .await
        .map_err(|e| match e {
            vb_ingest::IngestError::NotFound(id) => ApiError::new(
                VbError::new(
                    ErrorCode::PackageNotFound,
                    format!("no bid package found for id {id}"),
                )
                .with_context("package_id", id),
            ),
            other => ApiError::new(VbError::new(ErrorCode::Internal, other.to_string())),
        })?;

    let stats = vb_optimizer::analytics::compute_stats(&package);
    let package = Arc::new(package);

    match state
        .rulepack_cache
        .get(&req.ctx.airline, &req.ctx.month)
        .await
    {
        Ok(rule_pack) => Ok((
            FeatureBundle {
                ctx: req.ctx,
                preferences: req.preferences,
                package,
                rule_pack,
                far117: state.far117,
                contract: state.contract.clone(),
                stats,
            },
            false,
            Vec::new(),
        )),
        Err(err) => {
            warn!(error = %err, "no rule pack available, optimizing against FAR-117 baseline only");
            let baseline = vb_rulepack::CompiledRulePack::compile(vb_core::RulePackDef {
                meta: vb_core::RulePackMeta {
                    version: "legacy-baseline".to_string(),
                    airline: req.ctx.airline.clone(),
                    month: req.ctx.month.clone(),
                    expression_dialect: vb_rulepack::EXPECTED_DIALECT.to_string(),
                },
                hard_rules: vec![vb_core::HardRuleDef {
                    id: "far117_min_rest".to_string(),
                    description: "FAR-117 minimum rest between duty periods".to_string(),
                    severity: vb_core::Severity::Error,
                    check: "min(pairing.rest_before_minutes) >= far117.min_rest_minutes".to_string(),
                }],
                soft_rules: vec![],
            })
            .map_err(|e| ApiError::new(VbError::new(ErrorCode::Internal, e.to_string())))?;
            Ok((
                FeatureBundle {
                    ctx: req.ctx,
                    preferences: req.preferences,
                    package,
                    rule_pack: Arc::new(baseline),
                    far117: state.far117,
                    contract: state.contract.clone(),
                    stats,
                },
                true,
                vec!["rule_pack_missing".to_string()],
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// /api/optimize, /api/optimize/retune
// ---------------------------------------------------------------------------

async fn optimize_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, ApiError> {
    let (bundle, legacy_mode, warnings) = resolve_feature_bundle(&state, req.feature_bundle).await?;

    let mut config = state.beam_config;
    if let Some(k) = req.k {
        config.top_k = k;
    }

    let mut candidates = vb_optimizer::optimize(bundle, &config);
    candidates.truncate(config.top_k);

    Ok(Json(OptimizeResponse {
        candidates,
        optimizer_version: vb_core::PIPELINE_VERSION,
        legacy_mode,
        warnings,
    }))
}

async fn retune_handler(Json(req): Json<RetuneRequest>) -> Json<OptimizeResponse> {
    let mut candidates = req.candidates;
    vb_optimizer::retune(&mut candidates, &req.weight_deltas);
    Json(OptimizeResponse {
        candidates,
        optimizer_version: vb_core::PIPELINE_VERSION,
        legacy_mode: false,
        warnings: Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// /api/strategy
// ---------------------------------------------------------------------------

async fn strategy_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StrategyRequest>,
) -> Result<Json<StrategyResponse>, ApiError> {
    let (bundle, _legacy, _warnings) = resolve_feature_bundle(&state, req.feature_bundle).await?;
    let top_candidate = req.candidates.first();
    let directives =
        vb_strategy::build_strategy(&bundle.preferences.soft_prefs, &bundle.stats, top_candidate);
    Ok(Json(StrategyResponse { directives }))
}

// ---------------------------------------------------------------------------
// /api/generate_layers
// ---------------------------------------------------------------------------

async fn generate_layers_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateLayersRequest>,
) -> Result<Json<GenerateLayersResponse>, ApiError> {
    let ctx = req.feature_bundle.ctx.clone();
    let candidates_first = req.candidates.first().cloned();
    let (bundle, _legacy, _warnings) = resolve_feature_bundle(&state, req.feature_bundle).await?;

    let directives = req.directives.unwrap_or_else(|| {
        vb_strategy::build_strategy(&bundle.preferences.soft_prefs, &bundle.stats, candidates_first.as_ref())
    });

    let artifact = vb_strategy::generate_layers(
        &ctx,
        ctx.airline.clone(),
        ctx.month.clone(),
        directives.layer_templates,
        &bundle.stats,
    );
    Ok(Json(GenerateLayersResponse { artifact }))
}

// ---------------------------------------------------------------------------
// /api/lint
// ---------------------------------------------------------------------------

async fn lint_handler(Json(req): Json<LintRequest>) -> Json<LintResponse> {
    let lint = vb_linter::lint(&req.artifact, vb_linter::KNOWN_FILTER_TYPES);
    Json(LintResponse { lint })
}

// ---------------------------------------------------------------------------
// /api/export
// ---------------------------------------------------------------------------

async fn export_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ExportRequest>,
) -> Result<Json<ExportResponse>, ApiError> {
    let expected_key = state.config.api_key_export.as_deref();
    let provided_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    match expected_key {
        Some(expected) if expected == provided_key => {}
        _ => {
            return Err(ApiError::new(VbError::new(
                ErrorCode::BadInputMalformedBody,
                "missing or invalid X-API-Key",
            )));
        }
    }

    let (signer, audit_store) = match (&state.signer, &state.audit_store) {
        (Some(s), Some(a)) => (s, a),
        _ => {
            return Err(ApiError::new(VbError::new(
                ErrorCode::ExportFailed,
                "export signing is not configured on this deployment",
            )));
        }
    };

    let export_id = uuid::Uuid::new_v4().to_string();
    let issued_at = chrono::Utc::now();
    let (rendered, record) = vb_export::export(
        &req.artifact,
        signer,
        export_id.clone(),
        req.ctx_id,
        req.pilot_id,
        issued_at,
    )
    .map_err(|e| ApiError::new(VbError::new(ErrorCode::ExportFailed, e.to_string())))?;

    audit_store
        .record(&record)
        .map_err(|e| ApiError::new(VbError::new(ErrorCode::ExportFailed, e.to_string())))?;

    Ok(Json(ExportResponse {
        export_id,
        bytes: base64_encode(rendered.as_bytes()),
        export_hash: record.artifact_hash,
        signature: record.signature,
        issued_at,
    }))
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

// ---------------------------------------------------------------------------
// /api/ingest
// ---------------------------------------------------------------------------

async fn ingest_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut fields: BTreeMap<String, String> = BTreeMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(VbError::new(ErrorCode::BadInputMalformedBody, e.to_string())))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            filename = field.file_name().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::new(VbError::new(ErrorCode::BadInputMalformedBody, e.to_string())))?;
            bytes = Some(data.to_vec());
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::new(VbError::new(ErrorCode::BadInputMalformedBody, e.to_string())))?;
            fields.insert(name, value);
        }
    }

    let bytes = bytes.ok_or_else(|| {
        ApiError::new(VbError::new(
            ErrorCode::BadInputMalformedBody,
            "multipart body is missing a 'file' field",
        ))
    })?;

    let required = ["airline", "month", "base", "fleet", "seat"];
    for field in required {
        if !fields.contains_key(field) {
            return Err(ApiError::new(
                VbError::new(
                    ErrorCode::BadInputMalformedBody,
                    format!("multipart body is missing required field '{field}'"),
                )
                .with_context("field", field),
            ));
        }
    }

    let seat = match fields["seat"].as_str() {
        "FO" => Seat::Fo,
        "CA" => Seat::Ca,
        other => {
            return Err(ApiError::new(
                VbError::new(
                    ErrorCode::BadInputUnknownEnumValue,
                    format!("unknown seat '{other}'"),
                )
                .with_context("field", "seat"),
            ));
        }
    };

    let request = vb_ingest::IngestRequest {
        airline: fields["airline"].clone(),
        month: fields["month"].clone(),
        base: fields["base"].clone(),
        fleet: fields["fleet"].clone(),
        seat,
        filename,
    };

    let package: BidPackage = state
        .package_store
        .ingest(&bytes, request)
        .await
        .map_err(|e| ApiError::new(VbError::new(ErrorCode::IngestParseFailed, e.to_string())))?;

    let summary = package.summarize();
    Ok(Json(IngestResponse {
        package_id: package.package_id,
        summary,
    }))
}

// ---------------------------------------------------------------------------
// /api/meta/parsers, /api/meta/version
// ---------------------------------------------------------------------------

async fn parsers_meta_handler() -> Json<ParsersMetaResponse> {
    Json(ParsersMetaResponse {
        supported_formats: vec!["pdf", "csv", "jsonl", "txt"],
        required_fields: vec!["airline", "month", "base", "fleet", "seat", "file"],
    })
}

fn version_registry() -> crate::versioning::ApiVersionRegistry {
    use crate::versioning::{ApiVersion, ApiVersionRegistry, VersionedEndpoint};

    let current = ApiVersion { major: 1, minor: 0 };
    let mut registry = ApiVersionRegistry::new(current);
    for path in [
        "/health",
        "/api/parse_preferences",
        "/api/validate_constraints",
        "/api/optimize",
        "/api/optimize/retune",
        "/api/strategy",
        "/api/generate_layers",
        "/api/lint",
        "/api/export",
        "/api/ingest",
        "/api/meta/parsers",
        "/api/meta/version",
        "/api/rule-packs",
    ] {
        registry.register(VersionedEndpoint {
            path: path.to_string(),
            min_version: ApiVersion { major: 1, minor: 0 },
            max_version: None,
            deprecated: false,
            deprecated_message: None,
        });
    }
    registry
}

async fn version_handler() -> Json<VersionResponse> {
    let registry = version_registry();
    Json(VersionResponse {
        pipeline_version: vb_core::PIPELINE_VERSION,
        api_version: registry.current_version().to_string(),
    })
}

// ---------------------------------------------------------------------------
// /api/rule-packs
// ---------------------------------------------------------------------------

async fn list_rule_packs_handler(State(state): State<Arc<AppState>>) -> Json<Vec<RulePackSummary>> {
    let root = PathBuf::from(&state.config.rule_packs_dir);
    let mut out = Vec::new();

    let Ok(mut airline_dirs) = tokio::fs::read_dir(&root).await else {
        return Json(out);
    };

    while let Ok(Some(airline_entry)) = airline_dirs.next_entry().await {
        if !airline_entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false)
        {
            continue;
        }
        let airline = airline_entry.file_name().to_string_lossy().to_string();
        let Ok(mut month_files) = tokio::fs::read_dir(airline_entry.path()).await else {
            continue;
        };
        while let Ok(Some(month_entry)) = month_files.next_entry().await {
            let file_name = month_entry.file_name().to_string_lossy().to_string();
            let Some(month) = file_name.strip_suffix(".yaml") else {
                continue;
            };
            if let Ok(pack) = state.rulepack_loader.load(&airline, month) {
                out.push(RulePackSummary {
                    airline: airline.clone(),
                    month: month.to_string(),
                    version: pack.meta.version.clone(),
                });
            }
        }
    }

    out.sort_by(|a, b| (&a.airline, &a.month).cmp(&(&b.airline, &b.month)));
    Json(out)
}

async fn get_rule_pack_handler(
    State(state): State<Arc<AppState>>,
    AxumPath((airline, month)): AxumPath<(String, String)>,
) -> Result<Json<vb_core::RulePackDef>, ApiError> {
    let path = state.rulepack_loader.path_for(&airline, &month);
    let text = tokio::fs::read_to_string(&path).await.map_err(|_| {
        ApiError::new(
            VbError::new(
                ErrorCode::RulePackNotFound,
                format!("no rule pack found for {airline}/{month}"),
            )
            .with_context("airline", airline.clone())
            .with_context("month", month.clone()),
        )
    })?;
    let def: vb_core::RulePackDef = serde_yaml::from_str(&text)
        .map_err(|e| ApiError::new(VbError::new(ErrorCode::Internal, e.to_string())))?;
    Ok(Json(def))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path) -> vb_config::VbConfig {
        let mut config = vb_config::VbConfig::default();
        config.rule_packs_dir = dir.join("rule-packs").to_string_lossy().to_string();
        config.packages_dir = dir.join("packages").to_string_lossy().to_string();
        config
    }

    #[tokio::test]
    async fn state_builds_with_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(test_config(dir.path())).unwrap();
        assert!(state.signer.is_none());
        assert!(state.audit_store.is_none());
    }

    #[tokio::test]
    async fn export_configured_builds_signer_and_audit_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.export_signing_secret = Some("test-secret".to_string());
        let state = AppState::new(config).unwrap();
        assert!(state.signer.is_some());
        assert!(state.audit_store.is_some());
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("packages"))
            .await
            .unwrap();
        let state = Arc::new(AppState::new(test_config(dir.path())).unwrap());
        let resp = health_handler(State(state)).await;
        assert_eq!(resp.0.status, "ok");
        assert_eq!(resp.0.storage, "ok");
    }

    #[tokio::test]
    async fn health_reports_unhealthy_when_packages_dir_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState::new(test_config(dir.path())).unwrap());
        let resp = health_handler(State(state)).await;
        assert_eq!(resp.0.status, "unhealthy");
        assert_eq!(resp.0.storage, "missing");
    }

    #[tokio::test]
    async fn list_rule_packs_empty_dir_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState::new(test_config(dir.path())).unwrap());
        let Json(packs) = list_rule_packs_handler(State(state)).await;
        assert!(packs.is_empty());
    }

    /// Spec §5: the deadline layer must cancel an in-flight handler and
    /// surface `deadline_exceeded` rather than let the client wait forever.
    #[tokio::test]
    async fn request_exceeding_deadline_returns_504_deadline_exceeded() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use axum::routing::get;
        use http_body_util::BodyExt;
        use tower::ServiceExt;

        let slow_app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    "too slow"
                }),
            )
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(handle_deadline_error))
                    .timeout(Duration::from_millis(5)),
            );

        let resp = slow_app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "DEADLINE_EXCEEDED");
    }

    /// A handler that finishes comfortably inside the deadline must be
    /// unaffected by the timeout layer wrapping it.
    #[tokio::test]
    async fn request_within_deadline_is_unaffected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("packages")).unwrap();
        let mut config = test_config(dir.path());
        config.request_deadline_ms = 30_000;
        let state = Arc::new(AppState::new(config).unwrap());
        let app = build_app(state);

        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let resp = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
