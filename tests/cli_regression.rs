// End-to-end runs of the buildscope binary.
// Requires: assert_cmd, predicates, tempfile in [dev-dependencies]

mod common;

use std::fs;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use tempfile::tempdir;

use common::fixture;

fn buildscope() -> Command {
    Command::cargo_bin("buildscope").unwrap()
}

#[test]
fn scan_reads_stdin_and_prints_report() {
    let output = buildscope()
        .arg("scan")
        .write_stdin("job: {\n\t\"@type\": \"build_cv\"\n\tpath: \"x\"\n}\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["contexts"][0]["type"], "build_cv");
    assert_eq!(report["parameters"][0]["name"], "path");
    assert_eq!(report["parameters"][0]["context_type"], "build_cv");
}

#[test]
fn scan_walks_directories_for_documents() {
    buildscope()
        .arg("scan")
        .arg(fixture("specs"))
        .assert()
        .success()
        .stdout(contains("pipeline.cue").and(contains("typos.cue")))
        .stdout(contains("notes.txt").not());
}

#[test]
fn scan_fails_on_prose() {
    let dir = tempdir().unwrap();
    let prose = dir.path().join("prose.cue");
    fs::write(&prose, "This is not a config file.").unwrap();

    buildscope()
        .arg("scan")
        .arg(&prose)
        .assert()
        .failure()
        .stderr(contains("buildscope::scan::structural_failure"));
}

#[test]
fn resolve_prints_definition() {
    buildscope()
        .args(["resolve", "--catalog"])
        .arg(fixture("catalog.json"))
        .args(["subchunkable", "--version", "0.1.2"])
        .assert()
        .success()
        .stdout(contains("\"name\": \"subchunkable_v0_1_0\""));
}

#[test]
fn resolve_unknown_builder_renders_diagnostic() {
    buildscope()
        .args(["resolve", "--catalog"])
        .arg(fixture("catalog.json"))
        .arg("subchunkabel")
        .assert()
        .failure()
        .stderr(contains("buildscope::resolve::unknown_builder").and(contains("subchunkable")));
}

#[test]
fn check_clean_document_succeeds() {
    buildscope()
        .args(["check", "--catalog"])
        .arg(fixture("catalog.json"))
        .arg(fixture("specs/pipeline.cue"))
        .assert()
        .success()
        .stdout(contains("1 document(s) checked: 0 error(s), 0 warning(s)"));
}

#[test]
fn check_reports_findings_and_fails() {
    buildscope()
        .args(["check", "--catalog"])
        .arg(fixture("catalog.json"))
        .arg(fixture("specs/typos.cue"))
        .assert()
        .failure()
        .stdout(
            contains("typos.cue:7:2: error: unknown parameter `pth`")
                .and(contains("help: did you mean `path`?"))
                .and(contains("4 error(s), 1 warning(s)")),
        )
        .stderr(contains("buildscope::cli::check_failed"));
}

#[test]
fn builders_lists_ranges_and_issues() {
    buildscope()
        .args(["builders", "--catalog"])
        .arg(fixture("catalog.json"))
        .assert()
        .success()
        .stdout(
            contains("subchunkable_v0_1_0")
                .and(contains(">=0.1.0 <0.2.0"))
                .and(contains("warning: broken"))
                .and(contains("default version: 0.2.0")),
        );
}

#[test]
fn config_file_is_applied() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("buildscope.yaml");
    fs::write(&config, "tags:\n  type_tag: kind\n").unwrap();

    buildscope()
        .arg("--config")
        .arg(&config)
        .arg("scan")
        .write_stdin("job: {\n\tkind: \"build_cv\"\n\tpath: \"x\"\n}\n")
        .assert()
        .success()
        .stdout(contains("\"type\": \"build_cv\""));
}

#[test]
fn bad_config_is_rejected() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("buildscope.toml");
    fs::write(&config, "").unwrap();

    buildscope()
        .arg("--config")
        .arg(&config)
        .arg("scan")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(contains("buildscope::config::format"));
}
