//! Structural scoping of builder invocations in CUE-style configuration
//! documents, and version-range resolution of those invocations against a
//! catalog of builder definitions.
//!
//! The pipeline has two independent stages joined by the validator:
//!
//! - **scanning** ([`scanner`], [`syntax`], [`scope`]): document text to a
//!   [`ScopeReport`] of contexts and the parameters each one owns;
//! - **resolution** ([`catalog`]): `(name, version)` to exactly one
//!   [`BuilderDefinition`];
//! - **validation** ([`validate`]): a report checked against a catalog
//!   snapshot.

pub use crate::catalog::{BuilderCatalog, BuilderDefinition, CatalogHandle, ParameterSpec};
pub use crate::config::EngineConfig;
pub use crate::diagnostics::{Advisory, AdvisoryKind, ResolutionError, ScanError, Severity};
pub use crate::scanner::{scan_or_empty, Scanner, TreeScanner};
pub use crate::scope::{Context, Parameter, ScopeReport};
pub use crate::validate::{Finding, FindingKind, Validator};

pub mod catalog;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod scanner;
pub mod scope;
pub mod syntax;
pub mod validate;

/// Scans `source` in process with the default tags.
pub fn scan_document(source: &str) -> Result<ScopeReport, ScanError> {
    TreeScanner::default().scan(source)
}
