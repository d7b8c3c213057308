// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loads rule-pack YAML from a layered filesystem: `{root}/{airline}/{month}.yaml`.

use crate::compiled::{CompileError, CompiledRulePack};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vb_core::RulePackDef;

/// Errors raised while loading a rule pack from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No pack file exists for `(airline, month)`.
    #[error("no rule pack found for {airline}/{month}")]
    NotFound {
        /// Airline code requested.
        airline: String,
        /// Month requested.
        month: String,
    },
    /// The file could not be read.
    #[error("failed to read rule pack file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file was not valid YAML in the `RulePackDef` shape.
    #[error("failed to parse rule pack YAML at {path}: {source}")]
    Yaml {
        /// Path that failed to parse.
        path: String,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },
    /// Schema validation or expression compilation failed.
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Resolves `(airline, month)` to a file path and loads + compiles it.
///
/// Per spec §4.2, `meta.month` may be a single `YYYY-MM` or the start of a
/// date range; the on-disk file is still addressed by the request month so
/// each month a pack covers has its own file (or a symlink/copy set up by
/// the operator), keeping `Load` a pure `(airline, month) -> file` lookup.
#[derive(Debug, Clone)]
pub struct RulePackLoader {
    root: PathBuf,
}

impl RulePackLoader {
    /// Create a loader rooted at `root` (typically `$RULE_PACKS_DIR`).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path a pack for `(airline, month)` would be read from.
    #[must_use]
    pub fn path_for(&self, airline: &str, month: &str) -> PathBuf {
        self.root.join(airline).join(format!("{month}.yaml"))
    }

    /// The on-disk file version used for cache-key invalidation: the file's
    /// modified time as a Unix timestamp, or `0` if the file does not exist
    /// or the filesystem does not report mtimes.
    #[must_use]
    pub fn file_version(&self, airline: &str, month: &str) -> u64 {
        std::fs::metadata(self.path_for(airline, month))
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Load, validate, and compile the pack for `(airline, month)`.
    pub fn load(&self, airline: &str, month: &str) -> Result<CompiledRulePack, LoadError> {
        let path = self.path_for(airline, month);
        self.load_path(&path, airline, month)
    }

    fn load_path(&self, path: &Path, airline: &str, month: &str) -> Result<CompiledRulePack, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound {
                airline: airline.to_string(),
                month: month.to_string(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let def: RulePackDef = serde_yaml::from_str(&text).map_err(|source| LoadError::Yaml {
            path: path.display().to_string(),
            source,
        })?;
        Ok(CompiledRulePack::compile(def)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_YAML: &str = r#"
meta:
  version: "2025.1"
  airline: UAL
  month: "2025-09"
  expression_dialect: vb-expr/v1
hard_rules:
  - id: far117_min_rest
    description: minimum rest
    severity: error
    check: "min(pairing.rest_before_minutes) >= far117.min_rest_minutes"
soft_rules:
  - name: credit
    description: prefer higher credit
    score: "candidate.credit_minutes / 1000"
    weight: 1.0
"#;

    #[test]
    fn loads_and_compiles_valid_pack() {
        let dir = tempfile::tempdir().unwrap();
        let airline_dir = dir.path().join("UAL");
        std::fs::create_dir_all(&airline_dir).unwrap();
        let mut f = std::fs::File::create(airline_dir.join("2025-09.yaml")).unwrap();
        f.write_all(SAMPLE_YAML.as_bytes()).unwrap();

        let loader = RulePackLoader::new(dir.path());
        let pack = loader.load("UAL", "2025-09").unwrap();
        assert_eq!(pack.hard_rules.len(), 1);
        assert!(loader.file_version("UAL", "2025-09") > 0);
    }

    #[test]
    fn missing_pack_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = RulePackLoader::new(dir.path());
        assert!(matches!(
            loader.load("XYZ", "2030-01"),
            Err(LoadError::NotFound { .. })
        ));
    }
}
