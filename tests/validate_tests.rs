mod common;

use std::fs;

use buildscope::catalog::parse_catalog;
use buildscope::config::EngineConfig;
use buildscope::{FindingKind, Severity, Validator};
use common::{fixture, fixture_catalog, scan};

fn check_fixture(name: &str) -> Vec<buildscope::Finding> {
    let source = fs::read_to_string(fixture(name)).unwrap();
    let catalog = fixture_catalog();
    Validator::new(&catalog).validate(&scan(&source)).unwrap()
}

#[test]
fn well_formed_pipeline_is_clean() {
    let findings = check_fixture("specs/pipeline.cue");
    assert!(findings.is_empty(), "{findings:#?}");
}

#[test]
fn typos_are_reported_in_document_order() {
    let findings = check_fixture("specs/typos.cue");
    let summary: Vec<_> = findings
        .iter()
        .map(|f| (f.kind, f.severity, f.line, f.column))
        .collect();

    assert_eq!(
        summary,
        vec![
            (FindingKind::UnknownBuilder, Severity::Error, 2, 2),
            (FindingKind::MissingParameter, Severity::Error, 6, 2),
            (FindingKind::UnknownParameter, Severity::Error, 7, 2),
            (FindingKind::TypeMismatch, Severity::Warning, 8, 2),
            (FindingKind::NoVersionMatch, Severity::Error, 11, 2),
        ]
    );
    assert_eq!(findings[0].suggestions, vec!["subchunkable"]);
    assert_eq!(findings[2].suggestions, vec!["path"]);
    assert_eq!(findings[4].builder, "subchunkable");
}

#[test]
fn finding_display_is_position_prefixed() {
    let findings = check_fixture("specs/typos.cue");
    assert_eq!(
        findings[2].to_string(),
        "7:2: error: unknown parameter `pth` for `build_cv` (did you mean path?)"
    );
}

#[test]
fn suggestion_threshold_follows_config() {
    let source = "cv: {\n\t\"@type\": \"build_cv\"\n\tpath: \"x\"\n\tresolutoin: [1]\n}\n";
    let catalog = fixture_catalog();
    let report = scan(source);

    let default = Validator::new(&catalog).validate(&report).unwrap();
    assert_eq!(default[0].suggestions, vec!["resolution"]);

    let strict = EngineConfig::from_yaml_str("suggestions:\n  parameter_distance: 1\n").unwrap();
    let findings = Validator::with_config(&catalog, &strict).validate(&report).unwrap();
    assert_eq!(findings[0].kind, FindingKind::UnknownParameter);
    assert!(findings[0].suggestions.is_empty());
}

#[test]
fn ambiguous_catalog_stops_validation() {
    let catalog = parse_catalog(
        r#"{"builders": [
            {"name": "a_v1", "version_spec": ">=1"},
            {"name": "a", "version_spec": "*"}
        ], "default_version": "1.0.0"}"#,
    )
    .unwrap();
    let report = scan("x: {\"@type\": \"a\"}\n");
    assert!(Validator::new(&catalog).validate(&report).unwrap_err().is_hard());
}
