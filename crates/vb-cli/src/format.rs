// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output formatting utilities for the VectorBid CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vb_core::layer::{BidLayerArtifact, LintReport, PreferDirective};
use vb_core::{BidPackage, CandidateSchedule};
use vb_rulepack::CompiledRulePack;

/// Supported output formats for CLI display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Compact JSON (single line).
    Json,
    /// Pretty-printed JSON.
    JsonPretty,
    /// Human-readable multi-line text.
    Text,
    /// Key-value aligned table.
    Table,
    /// Single-line summary.
    Compact,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
            Self::Text => "text",
            Self::Table => "table",
            Self::Compact => "compact",
        };
        f.write_str(s)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "json-pretty" | "json_pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            "text" => Ok(Self::Text),
            "table" => Ok(Self::Table),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Formats VectorBid pipeline types for CLI output.
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Create a new formatter with the given output format.
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format an ingested [`BidPackage`]'s summary according to the
    /// configured output format.
    #[must_use]
    pub fn format_package_summary(&self, package: &BidPackage) -> String {
        let summary = package.summarize();
        match &self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                let value = serde_json::json!({
                    "package_id": package.package_id,
                    "airline": package.airline,
                    "month": package.month,
                    "base": package.base,
                    "fleet": package.fleet,
                    "trips": summary.trips,
                    "legs": summary.legs,
                    "date_span": summary.date_span,
                    "credit_total": summary.credit_total,
                });
                if self.format == OutputFormat::JsonPretty {
                    serde_json::to_string_pretty(&value).unwrap_or_default()
                } else {
                    value.to_string()
                }
            }
            OutputFormat::Text => format_package_summary_text(package, summary.trips, summary.credit_total),
            OutputFormat::Table => format_package_summary_table(package, summary.trips, summary.credit_total),
            OutputFormat::Compact => format_package_summary_compact(package, summary.trips),
        }
    }

    /// Format a slice of ranked [`CandidateSchedule`]s.
    #[must_use]
    pub fn format_candidates(&self, candidates: &[CandidateSchedule]) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(candidates).unwrap_or_default(),
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(candidates).unwrap_or_default()
            }
            OutputFormat::Text => format_candidates_text(candidates),
            OutputFormat::Table => format_candidates_table(candidates),
            OutputFormat::Compact => format_candidates_compact(candidates),
        }
    }

    /// Format a generated [`BidLayerArtifact`].
    #[must_use]
    pub fn format_artifact(&self, artifact: &BidLayerArtifact) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(artifact).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(artifact).unwrap_or_default(),
            OutputFormat::Text => format_artifact_text(artifact),
            OutputFormat::Table => format_artifact_table(artifact),
            OutputFormat::Compact => format_artifact_compact(artifact),
        }
    }

    /// Format a compiled rule pack's summary (for `validate-rulepack`).
    #[must_use]
    pub fn format_rule_pack(&self, pack: &CompiledRulePack) -> String {
        match &self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => serde_json::json!({
                "version": pack.meta.version,
                "airline": pack.meta.airline,
                "month": pack.meta.month,
                "hard_rules": pack.hard_rules.len(),
                "soft_rules": pack.soft_rules.len(),
            })
            .to_string(),
            OutputFormat::Text => format!(
                "Rule pack {} / {} version {}\nHard rules: {}\nSoft rules: {}",
                pack.meta.airline,
                pack.meta.month,
                pack.meta.version,
                pack.hard_rules.len(),
                pack.soft_rules.len(),
            ),
            OutputFormat::Table => format!(
                "{:<12} {}\n{:<12} {}\n{:<12} {}\n{:<12} {}\n{:<12} {}",
                "airline",
                pack.meta.airline,
                "month",
                pack.meta.month,
                "version",
                pack.meta.version,
                "hard_rules",
                pack.hard_rules.len(),
                "soft_rules",
                pack.soft_rules.len(),
            ),
            OutputFormat::Compact => format!(
                "[{}/{}] hard={} soft={}",
                pack.meta.airline,
                pack.meta.month,
                pack.hard_rules.len(),
                pack.soft_rules.len(),
            ),
        }
    }

    /// Format an error message according to the configured output format.
    #[must_use]
    pub fn format_error(&self, err: &str) -> String {
        match &self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                serde_json::json!({"error": err}).to_string()
            }
            OutputFormat::Text => format!("Error: {err}"),
            OutputFormat::Table => format!("error  {err}"),
            OutputFormat::Compact => format!("[error] {err}"),
        }
    }
}

// ── helpers ───────────────────────────────────────────────────────────

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…", &s[..max])
    }
}

fn lint_summary(report: &LintReport) -> String {
    format!(
        "{} error(s), {} warning(s)",
        report.errors.len(),
        report.warnings.len()
    )
}

// ── BidPackage summary formatters ────────────────────────────────────

fn format_package_summary_text(p: &BidPackage, trips: u32, credit_total: u32) -> String {
    format!(
        "Package: {}\nAirline: {} / {}\nBase: {}  Fleet: {}\nTrips: {}  Credit total: {}",
        p.package_id, p.airline, p.month, p.base, p.fleet, trips, credit_total,
    )
}

fn format_package_summary_table(p: &BidPackage, trips: u32, credit_total: u32) -> String {
    let mut lines = Vec::new();
    lines.push(format!("{:<14} {}", "package_id", p.package_id));
    lines.push(format!("{:<14} {}", "airline", p.airline));
    lines.push(format!("{:<14} {}", "month", p.month));
    lines.push(format!("{:<14} {}", "base", p.base));
    lines.push(format!("{:<14} {}", "fleet", p.fleet));
    lines.push(format!("{:<14} {}", "trips", trips));
    lines.push(format!("{:<14} {}", "credit_total", credit_total));
    lines.join("\n")
}

fn format_package_summary_compact(p: &BidPackage, trips: u32) -> String {
    format!("[{}] {}/{} trips={}", p.package_id, p.airline, p.month, trips)
}

// ── CandidateSchedule formatters ─────────────────────────────────────

fn format_candidates_text(candidates: &[CandidateSchedule]) -> String {
    candidates
        .iter()
        .map(|c| {
            format!(
                "{} score={:.3} hard_ok={} pairings={}",
                c.candidate_id,
                c.score,
                c.hard_ok,
                c.pairings.len(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_candidates_table(candidates: &[CandidateSchedule]) -> String {
    let mut lines = vec![format!(
        "{:<24} {:>8} {:>8} {:>9}",
        "candidate_id", "score", "hard_ok", "pairings"
    )];
    for c in candidates {
        lines.push(format!(
            "{:<24} {:>8.3} {:>8} {:>9}",
            truncate(&c.candidate_id, 24),
            c.score,
            c.hard_ok,
            c.pairings.len(),
        ));
    }
    lines.join("\n")
}

fn format_candidates_compact(candidates: &[CandidateSchedule]) -> String {
    candidates
        .iter()
        .map(|c| format!("[{}] score={:.3}", c.candidate_id, c.score))
        .collect::<Vec<_>>()
        .join(" | ")
}

// ── BidLayerArtifact formatters ──────────────────────────────────────

fn format_artifact_text(a: &BidLayerArtifact) -> String {
    let mut out = format!(
        "Airline: {}  Month: {}  Format: {}\nLayers: {}\nLint: {}",
        a.airline,
        a.month,
        a.format,
        a.layers.len(),
        lint_summary(&a.lint),
    );
    for layer in &a.layers {
        let prefer = match layer.prefer {
            PreferDirective::Yes => "PREFER",
            PreferDirective::No => "AVOID",
        };
        out.push_str(&format!(
            "\n  #{}: {} filter(s), {}",
            layer.n,
            layer.filters.len(),
            prefer,
        ));
    }
    out
}

fn format_artifact_table(a: &BidLayerArtifact) -> String {
    let mut lines = Vec::new();
    lines.push(format!("{:<10} {}", "airline", a.airline));
    lines.push(format!("{:<10} {}", "month", a.month));
    lines.push(format!("{:<10} {}", "format", a.format));
    lines.push(format!("{:<10} {}", "layers", a.layers.len()));
    lines.push(format!("{:<10} {}", "lint", lint_summary(&a.lint)));
    lines.join("\n")
}

fn format_artifact_compact(a: &BidLayerArtifact) -> String {
    format!(
        "[{}/{}] layers={} lint=({})",
        a.airline,
        a.month,
        a.layers.len(),
        lint_summary(&a.lint),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vb_core::layer::{Filter, FilterOp, Layer};
    use vb_core::{CandidateState, SourceFormat};

    #[test]
    fn output_format_display_roundtrips() {
        for fmt in &[
            OutputFormat::Json,
            OutputFormat::JsonPretty,
            OutputFormat::Text,
            OutputFormat::Table,
            OutputFormat::Compact,
        ] {
            let s = fmt.to_string();
            let parsed: OutputFormat = s.parse().unwrap();
            assert_eq!(&parsed, fmt);
        }
    }

    #[test]
    fn output_format_from_str_rejects_unknown() {
        assert!("nope".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_long_string() {
        let long = "a".repeat(100);
        let t = truncate(&long, 10);
        assert!(t.len() < 100);
        assert!(t.ends_with('…'));
    }

    fn pairing(id: &str) -> vb_core::pairing::Pairing {
        vb_core::pairing::Pairing {
            pairing_id: id.into(),
            days: 3,
            credit_minutes: 900,
            block_minutes: 780,
            routing: vec!["DEN".into(), "ORD".into(), "DEN".into()],
            dates: Vec::new(),
            includes_weekend: false,
            has_red_eye: false,
            duty_periods: Vec::new(),
            layovers: Vec::new(),
            equipment: "737".into(),
            raw: String::new(),
        }
    }

    fn package() -> BidPackage {
        BidPackage {
            package_id: "abc123".into(),
            airline: "UAL".into(),
            month: "2025-09".into(),
            base: "DEN".into(),
            fleet: "737".into(),
            seat: vb_core::context::Seat::Fo,
            uploaded_at: chrono::Utc::now(),
            source_format: SourceFormat::Csv,
            pairings: vec![pairing("PR1"), pairing("PR2")],
        }
    }

    #[test]
    fn package_summary_text_includes_trip_count() {
        let f = Formatter::new(OutputFormat::Text);
        assert!(f.format_package_summary(&package()).contains("Trips: 2"));
    }

    #[test]
    fn package_summary_compact_is_single_line() {
        let f = Formatter::new(OutputFormat::Compact);
        let out = f.format_package_summary(&package());
        assert!(!out.contains('\n'));
    }

    fn candidate(id: &str, score: f64) -> CandidateSchedule {
        CandidateSchedule {
            candidate_id: id.into(),
            pairings: vec!["PR1".into()],
            state: CandidateState::Ranked,
            hard_ok: true,
            violations: Vec::new(),
            score,
            soft_breakdown: Default::default(),
            rationale: Vec::new(),
            legal_explanation: Vec::new(),
        }
    }

    #[test]
    fn candidates_table_has_header_row() {
        let f = Formatter::new(OutputFormat::Table);
        let out = f.format_candidates(&[candidate("c1", 0.5)]);
        assert!(out.lines().next().unwrap().contains("candidate_id"));
    }

    #[test]
    fn candidates_json_round_trips() {
        let f = Formatter::new(OutputFormat::Json);
        let out = f.format_candidates(&[candidate("c1", 0.5)]);
        let parsed: Vec<CandidateSchedule> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0].candidate_id, "c1");
    }

    fn artifact() -> BidLayerArtifact {
        BidLayerArtifact {
            airline: "UAL".into(),
            format: "PBS2".into(),
            month: "2025-09".into(),
            layers: vec![Layer {
                n: 1,
                filters: vec![Filter {
                    filter_type: "credit_minutes".into(),
                    op: FilterOp::Ge,
                    values: vec![serde_json::json!(3000.0)],
                }],
                prefer: PreferDirective::Yes,
                award_probability: None,
            }],
            lint: LintReport::default(),
            export_hash: None,
        }
    }

    #[test]
    fn artifact_text_lists_layers() {
        let f = Formatter::new(OutputFormat::Text);
        let out = f.format_artifact(&artifact());
        assert!(out.contains("#1"));
    }

    #[test]
    fn artifact_compact_reports_lint_summary() {
        let f = Formatter::new(OutputFormat::Compact);
        let out = f.format_artifact(&artifact());
        assert!(out.contains("lint="));
    }
}
