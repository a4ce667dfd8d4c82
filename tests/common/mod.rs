//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::path::PathBuf;

use buildscope::catalog::load_catalog;
use buildscope::{scan_document, BuilderCatalog, ScopeReport};

/// Path of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture_catalog() -> BuilderCatalog {
    load_catalog(&fixture("catalog.json")).expect("fixture catalog loads")
}

pub fn scan(source: &str) -> ScopeReport {
    scan_document(source).expect("document scans")
}

/// Names of the parameters owned by the context at `index`.
pub fn owned_names(report: &ScopeReport, index: usize) -> Vec<&str> {
    report
        .owned_parameters(index)
        .map(|p| p.name.as_str())
        .collect()
}

/// Type of the context owning the parameter called `name`.
pub fn owner_type<'a>(report: &'a ScopeReport, name: &str) -> &'a str {
    let parameter = report
        .parameters
        .iter()
        .find(|p| p.name == name)
        .unwrap_or_else(|| panic!("no parameter `{name}`"));
    &parameter.context_type
}
