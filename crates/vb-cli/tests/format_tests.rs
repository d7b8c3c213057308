// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tests that the `--format` flag actually changes the `vb` binary's
//! output shape across its supported formats.

use assert_cmd::Command;
use predicates::prelude::*;

fn vb() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("vb").expect("binary `vb` should be built")
}

const SAMPLE_RULE_PACK: &str = r#"
meta:
  version: "2025.1"
  airline: UAL
  month: "2025-09"
  expression_dialect: vb-expr/v1
hard_rules: []
soft_rules: []
"#;

#[test]
fn json_format_produces_parseable_single_line_object() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("pack.yaml");
    std::fs::write(&file, SAMPLE_RULE_PACK).unwrap();

    let out = vb()
        .args(["--format", "json", "rulepack", "validate"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(parsed["airline"], "UAL");
}

#[test]
fn table_format_aligns_key_value_rows() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("pack.yaml");
    std::fs::write(&file, SAMPLE_RULE_PACK).unwrap();

    vb().args(["--format", "table", "rulepack", "validate"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("airline"))
        .stdout(predicate::str::contains("UAL"));
}

#[test]
fn compact_format_is_single_line() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("pack.yaml");
    std::fs::write(&file, SAMPLE_RULE_PACK).unwrap();

    let out = vb()
        .args(["--format", "compact", "rulepack", "validate"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(stdout.trim().lines().count(), 1);
}

#[test]
fn unknown_format_flag_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("pack.yaml");
    std::fs::write(&file, SAMPLE_RULE_PACK).unwrap();

    vb().args(["--format", "xml", "rulepack", "validate"])
        .arg(&file)
        .assert()
        .failure();
}
