mod common;

use buildscope::config::TagConfig;
use buildscope::scope::{classify, FieldClass};
use buildscope::{AdvisoryKind, ScanError, Scanner, TreeScanner};
use common::{owned_names, owner_type, scan};

// ============================================================================
// OWNERSHIP
// ============================================================================

const NESTED: &str = r#"outer: {
	"@type": "a"
	x: 1
	inner: {
		"@type": "b"
		y: 2
	}
	z: 3
}
"#;

#[test]
fn parameters_belong_to_nearest_context() {
    let report = scan(NESTED);

    assert_eq!(report.contexts.len(), 2);
    assert_eq!(owned_names(&report, 0), vec!["x", "inner", "z"]);
    assert_eq!(owned_names(&report, 1), vec!["y"]);
    assert_eq!(owner_type(&report, "y"), "b");
    assert_eq!(owner_type(&report, "z"), "a");
}

#[test]
fn contexts_carry_tag_position_and_record_bounds() {
    let report = scan(NESTED);
    let outer = &report.contexts[0];
    let inner = &report.contexts[1];

    assert_eq!((outer.line, outer.column), (2, 2));
    assert_eq!((outer.start_line, outer.end_line), (1, 9));
    assert_eq!((inner.line, inner.column), (5, 3));
    assert_eq!((inner.start_line, inner.end_line), (4, 7));
}

#[test]
fn context_bounds_are_stable_across_scans() {
    let first = scan(NESTED);
    let second = scan(NESTED);
    assert_eq!(first, second);
}

#[test]
fn field_before_tag_on_same_line_belongs_to_outer_context() {
    let report = scan(
        "outer: {\n\t\"@type\": \"a\"\n\tinner: { before: 1, \"@type\": \"b\", after: 2 }\n}\n",
    );

    assert_eq!(owner_type(&report, "before"), "a");
    assert_eq!(owner_type(&report, "inner"), "a");
    assert_eq!(owner_type(&report, "after"), "b");
}

#[test]
fn field_before_tag_without_outer_context_is_dropped() {
    let report = scan("job: { early: 1, \"@type\": \"a\", late: 2 }\n");
    let names: Vec<_> = report.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["late"]);
}

#[test]
fn fields_under_untyped_record_belong_to_no_context() {
    let report = scan("a: {\n\t\"@type\": \"A\"\n\tplain: {\n\t\tdeep: 1\n\t}\n\tafter: 2\n}\n");

    assert_eq!(report.contexts.len(), 1);
    assert_eq!(owned_names(&report, 0), vec!["plain", "after"]);
    assert!(report.parameters.iter().all(|p| p.name != "deep"));
}

#[test]
fn untyped_records_contribute_nothing() {
    let report = scan("settings: {\n\tdebug: true\n}\n");
    assert!(report.is_empty());
}

// ============================================================================
// MALFORMED INPUT
// ============================================================================

#[test]
fn missing_closing_brace_keeps_valid_prefix() {
    let report = scan("job: {\n\t\"@type\": \"a\"\n\tp: 1\n");

    assert_eq!(report.contexts.len(), 1);
    assert_eq!(owned_names(&report, 0), vec!["p"]);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.kind == AdvisoryKind::RecoverableSyntax));
}

#[test]
fn prose_is_a_structural_failure() {
    let err = TreeScanner::default()
        .scan("this is not a configuration document")
        .unwrap_err();
    assert!(matches!(err, ScanError::StructuralFailure { .. }));
}

// ============================================================================
// NAMES
// ============================================================================

#[test]
fn name_rules() {
    let tags = TagConfig::default();
    assert_eq!(classify("_private", &tags), FieldClass::Private);
    assert_eq!(classify("#def", &tags), FieldClass::Private);
    assert_eq!(classify("@mode", &tags), FieldClass::Reserved);
    assert_eq!(classify("valid_Name1", &tags), FieldClass::Parameter);
    assert_eq!(classify("1bad", &tags), FieldClass::Invalid);
}

#[test]
fn excluded_names_never_become_parameters() {
    let report = scan(
        "x: {\n\t\"@type\": \"a\"\n\t_private: 1\n\t#def: 2\n\t\"@mode\": \"fast\"\n\tvalid_Name1: 3\n\t\"1bad\": 4\n}\n",
    );

    assert_eq!(owned_names(&report, 0), vec!["valid_Name1"]);
    let invalid: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.kind == AdvisoryKind::InvalidParameterName)
        .collect();
    assert_eq!(invalid.len(), 1);
    assert!(invalid[0].message.contains("1bad"));
}
