// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end CLI integration tests for the `vb` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn vb() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("vb").expect("binary `vb` should be built")
}

const SAMPLE_CSV: &str = "pairing_id,days,credit_minutes,block_minutes,routing,dates,includes_weekend,has_red_eye,equipment\nPR1,3,900,780,DEN;ORD;DEN,,false,false,737\nPR2,2,500,420,DEN;LAX;DEN,,true,false,737\n";

const SAMPLE_RULE_PACK: &str = r#"
meta:
  version: "2025.1"
  airline: UAL
  month: "2025-09"
  expression_dialect: vb-expr/v1
hard_rules:
  - id: min_credit
    description: must carry at least 10 credit hours
    severity: error
    check: "candidate.credit_minutes >= 600"
soft_rules:
  - name: credit_bonus
    description: reward extra credit
    score: "candidate.credit_minutes / 1000"
    weight: 1.0
    clamp_min: -1.0
    clamp_max: 1.0
"#;

// ── help / version ───────────────────────────────────────────────────

#[test]
fn help_exits_zero_and_lists_subcommands() {
    vb().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ingest"))
        .stdout(predicate::str::contains("optimize"))
        .stdout(predicate::str::contains("export"));
}

// ── ingest ───────────────────────────────────────────────────────────

#[test]
fn ingest_stores_package_and_prints_summary() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("pairings.csv");
    std::fs::write(&csv_path, SAMPLE_CSV).unwrap();
    let packages_dir = dir.path().join("packages");

    vb().arg("ingest")
        .arg(&csv_path)
        .args(["--airline", "UAL", "--month", "2025-09", "--base", "DEN", "--fleet", "737"])
        .args(["--packages-dir", packages_dir.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("UAL"));
}

#[test]
fn ingest_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    vb().arg("ingest")
        .arg(dir.path().join("nope.csv"))
        .args(["--airline", "UAL", "--month", "2025-09", "--base", "DEN", "--fleet", "737"])
        .args(["--packages-dir", dir.path().join("packages").to_str().unwrap()])
        .assert()
        .failure();
}

// ── rulepack ─────────────────────────────────────────────────────────

#[test]
fn rulepack_validate_reports_rule_counts() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("pack.yaml");
    std::fs::write(&file, SAMPLE_RULE_PACK).unwrap();

    vb().args(["rulepack", "validate"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Hard rules: 1"));
}

#[test]
fn rulepack_list_finds_nested_packs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("UAL")).unwrap();
    std::fs::write(dir.path().join("UAL/2025-09.yaml"), SAMPLE_RULE_PACK).unwrap();

    vb().args(["rulepack", "list", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("UAL/2025-09"));
}

#[test]
fn rulepack_show_prints_summary() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("UAL")).unwrap();
    std::fs::write(dir.path().join("UAL/2025-09.yaml"), SAMPLE_RULE_PACK).unwrap();

    vb().args(["rulepack", "show", "--dir"])
        .arg(dir.path())
        .args(["UAL", "2025-09"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Soft rules: 1"));
}

// ── parse ────────────────────────────────────────────────────────────

#[test]
fn parse_prints_preference_schema_json() {
    vb().arg("parse")
        .arg("no red eyes, prefer weekends off")
        .args(["--airline", "UAL", "--month", "2025-09", "--base", "DEN"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hard_constraints"));
}

#[test]
fn parse_expands_weekends_off_into_month_dates() {
    vb().arg("parse")
        .arg("weekends off, avoid red-eyes")
        .args(["--airline", "UAL", "--month", "2025-09", "--base", "DEN"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2025-09-06"))
        .stdout(predicate::str::contains("no_red_eyes").and(predicate::str::contains("true")));
}

// ── schema ───────────────────────────────────────────────────────────

#[test]
fn schema_package_prints_json_schema() {
    vb().args(["schema", "package"])
        .assert()
        .success()
        .stdout(predicate::str::contains("properties"));
}

// ── lint ─────────────────────────────────────────────────────────────

#[test]
fn lint_reports_no_findings_for_clean_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let artifact_path = dir.path().join("artifact.json");
    let artifact = serde_json::json!({
        "airline": "UAL",
        "format": "PBS2",
        "month": "2025-09",
        "layers": [{
            "n": 1,
            "filters": [{"filter_type": "credit_minutes", "op": "ge", "values": [3000.0]}],
            "prefer": "YES",
            "award_probability": null
        }],
        "lint": {"errors": [], "warnings": []},
        "export_hash": null
    });
    std::fs::write(&artifact_path, serde_json::to_vec_pretty(&artifact).unwrap()).unwrap();

    vb().arg("lint")
        .arg(&artifact_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"errors\": []"));
}

// ── export ───────────────────────────────────────────────────────────

#[test]
fn export_signs_artifact_and_prints_rendered_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let artifact_path = dir.path().join("artifact.json");
    let artifact = serde_json::json!({
        "airline": "UAL",
        "format": "PBS2",
        "month": "2025-09",
        "layers": [{
            "n": 1,
            "filters": [{"filter_type": "credit_minutes", "op": "ge", "values": [3000.0]}],
            "prefer": "YES",
            "award_probability": null
        }],
        "lint": {"errors": [], "warnings": []},
        "export_hash": null
    });
    std::fs::write(&artifact_path, serde_json::to_vec_pretty(&artifact).unwrap()).unwrap();

    vb().arg("export")
        .arg(&artifact_path)
        .args(["--secret", "test-secret-at-least-this-long"])
        .args(["--ctx-id", "ctx-1", "--pilot-id", "P1"])
        .assert()
        .success();
}
