// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for VectorBid.
//!
//! This crate provides [`VbConfig`] — the top-level runtime settings —
//! together with helpers for loading from TOML files, merging overlays, and
//! producing advisory [`ConfigWarning`]s.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },

    /// Two configs could not be merged because of conflicting constraints.
    #[error("merge conflict: {reason}")]
    MergeConflict {
        /// Description of the conflict.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A deprecated field was used in the configuration.
    DeprecatedField {
        /// Name of the deprecated field.
        field: String,
        /// Suggested replacement, if any.
        suggestion: Option<String>,
    },
    /// A recommended optional field is missing; the pipeline degrades
    /// gracefully rather than failing to start.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// A configured timeout is unusually large relative to its sibling
    /// deadlines.
    LargeTimeout {
        /// Which timeout field this concerns.
        field: String,
        /// Value in milliseconds.
        ms: u64,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::DeprecatedField { field, suggestion } => {
                write!(f, "deprecated field '{field}'")?;
                if let Some(s) = suggestion {
                    write!(f, " — use '{s}' instead")?;
                }
                Ok(())
            }
            ConfigWarning::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            ConfigWarning::LargeTimeout { field, ms } => {
                write!(f, "'{field}' has an unusually large timeout ({ms}ms)")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level runtime configuration for VectorBid.
///
/// Each field corresponds to one of the environment variables in
/// `apply_env_overrides`; env values always take precedence over a loaded
/// TOML file, matching the layered-config convention of the rest of the
/// stack.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct VbConfig {
    /// Directory rule-pack YAML files are loaded from.
    #[serde(default = "default_rule_packs_dir")]
    pub rule_packs_dir: String,

    /// Directory ingested bid packages are stored under.
    #[serde(default = "default_packages_dir")]
    pub packages_dir: String,

    /// Shared secret used to HMAC-sign exports. Export is disabled without
    /// one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_signing_secret: Option<String>,

    /// Primary LLM model identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_primary_model: Option<String>,

    /// Secondary (fallback) LLM model identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_secondary_model: Option<String>,

    /// API key for the primary LLM vendor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_primary_key: Option<String>,

    /// API key for the secondary LLM vendor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_secondary_key: Option<String>,

    /// API key required on `X-API-Key` for `/api/export`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_export: Option<String>,

    /// Overall per-request deadline, in milliseconds (§5 default 30s).
    #[serde(default = "default_request_deadline_ms")]
    pub request_deadline_ms: u64,

    /// Primary LLM call timeout, in milliseconds (§5 default 8s).
    #[serde(default = "default_llm_primary_timeout_ms")]
    pub llm_primary_timeout_ms: u64,

    /// Secondary LLM call timeout, in milliseconds (§5 default 4s).
    #[serde(default = "default_llm_secondary_timeout_ms")]
    pub llm_secondary_timeout_ms: u64,

    /// Bid-package read timeout, in milliseconds (§5 default 3s).
    #[serde(default = "default_package_read_timeout_ms")]
    pub package_read_timeout_ms: u64,

    /// Rule-pack read timeout, in milliseconds (§5 default 500ms, usually
    /// cache-hit).
    #[serde(default = "default_rulepack_read_timeout_ms")]
    pub rulepack_read_timeout_ms: u64,

    /// Capacity of the rule-pack LRU cache.
    #[serde(default = "default_rule_pack_cache_capacity")]
    pub rule_pack_cache_capacity: u32,

    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

fn default_rule_packs_dir() -> String {
    "rule-packs".into()
}

fn default_packages_dir() -> String {
    "packages".into()
}

fn default_request_deadline_ms() -> u64 {
    30_000
}

fn default_llm_primary_timeout_ms() -> u64 {
    8_000
}

fn default_llm_secondary_timeout_ms() -> u64 {
    4_000
}

fn default_package_read_timeout_ms() -> u64 {
    3_000
}

fn default_rulepack_read_timeout_ms() -> u64 {
    500
}

fn default_rule_pack_cache_capacity() -> u32 {
    64
}

impl Default for VbConfig {
    fn default() -> Self {
        Self {
            rule_packs_dir: default_rule_packs_dir(),
            packages_dir: default_packages_dir(),
            export_signing_secret: None,
            llm_primary_model: None,
            llm_secondary_model: None,
            llm_primary_key: None,
            llm_secondary_key: None,
            api_key_export: None,
            request_deadline_ms: default_request_deadline_ms(),
            llm_primary_timeout_ms: default_llm_primary_timeout_ms(),
            llm_secondary_timeout_ms: default_llm_secondary_timeout_ms(),
            package_read_timeout_ms: default_package_read_timeout_ms(),
            rulepack_read_timeout_ms: default_rulepack_read_timeout_ms(),
            rule_pack_cache_capacity: default_rule_pack_cache_capacity(),
            log_level: Some("info".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum allowed request deadline, in milliseconds (10 minutes).
const MAX_REQUEST_DEADLINE_MS: u64 = 600_000;

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`VbConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`VbConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<VbConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => VbConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`VbConfig`].
pub fn parse_toml(content: &str) -> Result<VbConfig, ConfigError> {
    toml::from_str::<VbConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides, per §6: `RULE_PACKS_DIR`,
/// `PACKAGES_DIR`, `EXPORT_SIGNING_SECRET`, `LLM_PRIMARY_MODEL`,
/// `LLM_SECONDARY_MODEL`, `LLM_PRIMARY_KEY`, `LLM_SECONDARY_KEY`,
/// `API_KEY_EXPORT`, `REQUEST_DEADLINE_MS`.
pub fn apply_env_overrides(config: &mut VbConfig) {
    if let Ok(val) = std::env::var("RULE_PACKS_DIR") {
        config.rule_packs_dir = val;
    }
    if let Ok(val) = std::env::var("PACKAGES_DIR") {
        config.packages_dir = val;
    }
    if let Ok(val) = std::env::var("EXPORT_SIGNING_SECRET") {
        config.export_signing_secret = Some(val);
    }
    if let Ok(val) = std::env::var("LLM_PRIMARY_MODEL") {
        config.llm_primary_model = Some(val);
    }
    if let Ok(val) = std::env::var("LLM_SECONDARY_MODEL") {
        config.llm_secondary_model = Some(val);
    }
    if let Ok(val) = std::env::var("LLM_PRIMARY_KEY") {
        config.llm_primary_key = Some(val);
    }
    if let Ok(val) = std::env::var("LLM_SECONDARY_KEY") {
        config.llm_secondary_key = Some(val);
    }
    if let Ok(val) = std::env::var("API_KEY_EXPORT") {
        config.api_key_export = Some(val);
    }
    if let Ok(val) = std::env::var("REQUEST_DEADLINE_MS") {
        if let Ok(ms) = val.parse::<u64>() {
            config.request_deadline_ms = ms;
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (invalid log level, out-of-range deadline) are returned as a
/// [`ConfigError::ValidationError`]; soft issues (missing secrets that only
/// disable a feature) come back as warnings.
pub fn validate_config(config: &VbConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref level) = config.log_level {
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(format!("invalid log_level '{level}'"));
        }
    }

    if config.request_deadline_ms == 0 || config.request_deadline_ms > MAX_REQUEST_DEADLINE_MS {
        errors.push(format!(
            "request_deadline_ms {} out of range (1..{MAX_REQUEST_DEADLINE_MS})",
            config.request_deadline_ms
        ));
    }

    for (field, ms) in [
        ("llm_primary_timeout_ms", config.llm_primary_timeout_ms),
        ("llm_secondary_timeout_ms", config.llm_secondary_timeout_ms),
        ("package_read_timeout_ms", config.package_read_timeout_ms),
        ("rulepack_read_timeout_ms", config.rulepack_read_timeout_ms),
    ] {
        if ms == 0 {
            errors.push(format!("{field} must be greater than zero"));
        } else if ms > config.request_deadline_ms {
            warnings.push(ConfigWarning::LargeTimeout {
                field: field.to_string(),
                ms,
            });
        }
    }

    if config.export_signing_secret.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "export_signing_secret".into(),
            hint: "/api/export will reject all requests until this is set".into(),
        });
    }
    if config.api_key_export.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "api_key_export".into(),
            hint: "/api/export will reject all requests until this is set".into(),
        });
    }
    if config.llm_primary_model.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "llm_primary_model".into(),
            hint: "preference parsing will always fall back to the rule-based parser".into(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations. Values in `overlay` take precedence over
/// `base`.
pub fn merge_configs(base: VbConfig, overlay: VbConfig) -> VbConfig {
    let default = VbConfig::default();
    VbConfig {
        rule_packs_dir: if overlay.rule_packs_dir != default.rule_packs_dir {
            overlay.rule_packs_dir
        } else {
            base.rule_packs_dir
        },
        packages_dir: if overlay.packages_dir != default.packages_dir {
            overlay.packages_dir
        } else {
            base.packages_dir
        },
        export_signing_secret: overlay.export_signing_secret.or(base.export_signing_secret),
        llm_primary_model: overlay.llm_primary_model.or(base.llm_primary_model),
        llm_secondary_model: overlay.llm_secondary_model.or(base.llm_secondary_model),
        llm_primary_key: overlay.llm_primary_key.or(base.llm_primary_key),
        llm_secondary_key: overlay.llm_secondary_key.or(base.llm_secondary_key),
        api_key_export: overlay.api_key_export.or(base.api_key_export),
        request_deadline_ms: if overlay.request_deadline_ms != default.request_deadline_ms {
            overlay.request_deadline_ms
        } else {
            base.request_deadline_ms
        },
        llm_primary_timeout_ms: if overlay.llm_primary_timeout_ms
            != default.llm_primary_timeout_ms
        {
            overlay.llm_primary_timeout_ms
        } else {
            base.llm_primary_timeout_ms
        },
        llm_secondary_timeout_ms: if overlay.llm_secondary_timeout_ms
            != default.llm_secondary_timeout_ms
        {
            overlay.llm_secondary_timeout_ms
        } else {
            base.llm_secondary_timeout_ms
        },
        package_read_timeout_ms: if overlay.package_read_timeout_ms
            != default.package_read_timeout_ms
        {
            overlay.package_read_timeout_ms
        } else {
            base.package_read_timeout_ms
        },
        rulepack_read_timeout_ms: if overlay.rulepack_read_timeout_ms
            != default.rulepack_read_timeout_ms
        {
            overlay.rulepack_read_timeout_ms
        } else {
            base.rulepack_read_timeout_ms
        },
        rule_pack_cache_capacity: if overlay.rule_pack_cache_capacity
            != default.rule_pack_cache_capacity
        {
            overlay.rule_pack_cache_capacity
        } else {
            base.rule_pack_cache_capacity
        },
        log_level: overlay.log_level.or(base.log_level),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
