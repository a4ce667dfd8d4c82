mod common;

use std::sync::Arc;
use std::thread;

use buildscope::catalog::{parse_catalog, resolve, CatalogHandle};
use buildscope::ResolutionError;
use common::fixture_catalog;

#[test]
fn picks_the_single_matching_range() {
    let catalog = fixture_catalog();

    let old = resolve(&catalog, "subchunkable", Some("0.1.5")).unwrap();
    assert_eq!(old.name, "subchunkable_v0_1_0");

    let new = resolve(&catalog, "subchunkable", Some("0.2.0")).unwrap();
    assert_eq!(new.name, "subchunkable");
    assert_eq!(new.metadata["module"], "builders.chunk");
}

#[test]
fn missing_version_uses_catalog_default() {
    let catalog = fixture_catalog();
    assert_eq!(catalog.default_version(), "0.2.0");
    assert_eq!(resolve(&catalog, "subchunkable", None).unwrap().name, "subchunkable");
    assert_eq!(resolve(&catalog, "subchunkable", Some("  ")).unwrap().name, "subchunkable");
}

#[test]
fn short_version_is_zero_padded_before_matching() {
    let catalog = fixture_catalog();
    assert_eq!(resolve(&catalog, "subchunkable", Some("0.3")).unwrap().name, "subchunkable");
    assert_eq!(
        resolve(&catalog, "subchunkable", Some("0.1")).unwrap().name,
        "subchunkable_v0_1_0"
    );
}

#[test]
fn suffixed_names_resolve_through_their_base() {
    let catalog = fixture_catalog();
    let def = resolve(&catalog, "subchunkable_v0_1_0", Some("0.1")).unwrap();
    assert_eq!(def.name, "subchunkable_v0_1_0");
}

#[test]
fn version_outside_every_range_lists_candidates() {
    let catalog = fixture_catalog();
    match resolve(&catalog, "subchunkable", Some("0.0.9")).unwrap_err() {
        ResolutionError::NoVersionMatch {
            normalized,
            candidates,
            ..
        } => {
            assert_eq!(normalized.as_deref(), Some("0.0.9"));
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn malformed_version_is_not_a_match() {
    let catalog = fixture_catalog();
    let err = resolve(&catalog, "build_cv", Some("latest")).unwrap_err();
    assert!(matches!(
        err,
        ResolutionError::NoVersionMatch { normalized: None, .. }
    ));
}

#[test]
fn unknown_builder_gets_suggestions() {
    let catalog = fixture_catalog();
    let err = resolve(&catalog, "subchunkabel", None).unwrap_err();
    assert!(matches!(err, ResolutionError::UnknownBuilder { .. }));
    assert_eq!(err.suggestions().first().map(String::as_str), Some("subchunkable"));
}

#[test]
fn unparsable_range_is_an_issue_not_a_failure() {
    let catalog = fixture_catalog();
    assert_eq!(catalog.issues().len(), 1);
    assert_eq!(catalog.issues()[0].builder, "broken");
    assert!(matches!(
        resolve(&catalog, "broken", Some("1.0.0")),
        Err(ResolutionError::NoVersionMatch { .. })
    ));
}

#[test]
fn overlapping_ranges_are_ambiguous() {
    let catalog = parse_catalog(
        r#"{"builders": [
            {"name": "pack_v0_1_0", "version_spec": ">=0.1.0"},
            {"name": "pack", "version_spec": ">=0.2.0"}
        ], "default_version": "0.3.0"}"#,
    )
    .unwrap();

    let err = resolve(&catalog, "pack", None).unwrap_err();
    assert!(err.is_hard());
    match err {
        ResolutionError::AmbiguousCatalog { version, matches, .. } => {
            assert_eq!(version, "0.3.0");
            assert_eq!(matches.len(), 2);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(resolve(&catalog, "pack", Some("0.1.9")).unwrap().name, "pack_v0_1_0");

    match resolve(&catalog, "pack", Some("0.15")).unwrap_err() {
        ResolutionError::AmbiguousCatalog { version, matches, .. } => {
            assert_eq!(version, "0.15.0");
            assert_eq!(matches.len(), 2);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn readers_keep_their_snapshot_during_reload() {
    let handle = Arc::new(CatalogHandle::new(fixture_catalog()));
    let before = handle.snapshot();

    let writer = {
        let handle = Arc::clone(&handle);
        thread::spawn(move || {
            handle.replace(parse_catalog(r#"{"builders": [{"name": "solo", "version_spec": "*"}]}"#).unwrap());
        })
    };
    writer.join().unwrap();

    assert!(resolve(&before, "subchunkable", None).is_ok());
    let after = handle.snapshot();
    assert!(resolve(&after, "subchunkable", None).is_err());
    assert_eq!(resolve(&after, "solo", None).unwrap().name, "solo");
}
