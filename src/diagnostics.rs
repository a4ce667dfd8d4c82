//! Error and advisory types for every stage of the engine.
//!
//! # Overview
//!
//! Two kinds of outcome leave the engine:
//!
//! - **Errors** (`ScanError`, `ResolutionError`, `CatalogError`, `ConfigError`)
//!   derive `thiserror::Error` and `miette::Diagnostic`, so the CLI can render
//!   them as rich reports with codes under `buildscope::*`.
//! - **Advisories** (`Advisory`) are non-fatal notes collected into scope
//!   reports: recoverable syntax errors, dropped parameter names and
//!   unsupported labels. They never abort a scan.
//!
//! Only `ScanError::StructuralFailure` and `ResolutionError::AmbiguousCatalog`
//! are meant to surface as failures. Everything else degrades to an empty or
//! partial result (see [`crate::scanner::scan_or_empty`]) or to a finding.

use std::fmt;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::syntax::Position;

// ============================================================================
// ADVISORIES
// ============================================================================

/// Classification of a non-fatal advisory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    /// Malformed input the parser recovered from.
    RecoverableSyntax,
    /// A field name that fails the parameter-name grammar.
    InvalidParameterName,
    /// A field label that is neither quoted nor a bare identifier.
    UnsupportedLabel,
}

impl AdvisoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvisoryKind::RecoverableSyntax => "recoverable_syntax",
            AdvisoryKind::InvalidParameterName => "invalid_parameter_name",
            AdvisoryKind::UnsupportedLabel => "unsupported_label",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A non-fatal note attached to a scope report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Advisory {
    pub fn recoverable_syntax(message: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            kind: AdvisoryKind::RecoverableSyntax,
            severity: Severity::Warning,
            message: message.into(),
            position,
        }
    }

    pub fn invalid_parameter_name(name: &str, position: Option<Position>) -> Self {
        Self {
            kind: AdvisoryKind::InvalidParameterName,
            severity: Severity::Warning,
            message: format!("skipping invalid parameter name `{name}`"),
            position,
        }
    }

    pub fn unsupported_label(text: &str, position: Position) -> Self {
        Self {
            kind: AdvisoryKind::UnsupportedLabel,
            severity: Severity::Info,
            message: format!("label `{text}` cannot name a parameter"),
            position: Some(position),
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{}:{}: {}", pos.line, pos.column, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

// ============================================================================
// SCAN ERRORS
// ============================================================================

/// Failure of the structural stage.
#[derive(Debug, Error, Diagnostic)]
pub enum ScanError {
    #[error("no usable syntax tree: {message}")]
    #[diagnostic(
        code(buildscope::scan::structural_failure),
        help("the document does not contain any record-literal syntax")
    )]
    StructuralFailure {
        message: String,
        position: Option<Position>,
    },

    #[error("structural parser timed out after {elapsed_ms} ms")]
    #[diagnostic(code(buildscope::scan::timeout))]
    Timeout { elapsed_ms: u64 },

    #[error("failed to run structural parser `{program}`")]
    #[diagnostic(code(buildscope::scan::io))]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    pub fn structural_failure(message: impl Into<String>, position: Option<Position>) -> Self {
        ScanError::StructuralFailure {
            message: message.into(),
            position,
        }
    }
}

// ============================================================================
// RESOLUTION ERRORS
// ============================================================================

/// A catalog entry considered during resolution, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRange {
    pub name: String,
    pub version_spec: Option<String>,
}

impl fmt::Display for CandidateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_spec {
            Some(spec) => write!(f, "{} ({})", self.name, spec),
            None => write!(f, "{} (no version range)", self.name),
        }
    }
}

/// Failure to pick exactly one catalog definition.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum ResolutionError {
    #[error("unknown builder `{name}`")]
    #[diagnostic(code(buildscope::resolve::unknown_builder))]
    UnknownBuilder {
        name: String,
        suggestions: Vec<String>,
        #[help]
        help: Option<String>,
    },

    #[error("no definition of `{name}` accepts version `{version}`")]
    #[diagnostic(code(buildscope::resolve::no_version_match))]
    NoVersionMatch {
        name: String,
        version: String,
        /// `None` when the requested version could not be normalized.
        normalized: Option<String>,
        candidates: Vec<CandidateRange>,
        #[help]
        help: Option<String>,
    },

    #[error("ambiguous catalog: {} definitions of `{name}` accept version `{version}`", .matches.len())]
    #[diagnostic(
        code(buildscope::resolve::ambiguous_catalog),
        severity(Error),
        help("catalog entries for one builder must have non-overlapping version ranges")
    )]
    AmbiguousCatalog {
        name: String,
        version: String,
        matches: Vec<CandidateRange>,
    },
}

impl ResolutionError {
    pub fn unknown_builder(name: &str, suggestions: Vec<String>) -> Self {
        let help = did_you_mean(&suggestions);
        ResolutionError::UnknownBuilder {
            name: name.to_string(),
            suggestions,
            help,
        }
    }

    pub fn no_version_match(
        name: &str,
        version: &str,
        normalized: Option<String>,
        candidates: Vec<CandidateRange>,
    ) -> Self {
        let tried = candidates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let help = match &normalized {
            None => Some(format!(
                "`{version}` is not a version (expected major[.minor[.patch]]); candidates: {tried}"
            )),
            Some(_) => Some(format!("candidates: {tried}")),
        };
        ResolutionError::NoVersionMatch {
            name: name.to_string(),
            version: version.to_string(),
            normalized,
            candidates,
            help,
        }
    }

    pub fn ambiguous(name: &str, version: &str, matches: Vec<CandidateRange>) -> Self {
        ResolutionError::AmbiguousCatalog {
            name: name.to_string(),
            version: version.to_string(),
            matches,
        }
    }

    /// True for errors that signal a catalog defect rather than a user mistake.
    pub fn is_hard(&self) -> bool {
        matches!(self, ResolutionError::AmbiguousCatalog { .. })
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            ResolutionError::UnknownBuilder { suggestions, .. } => suggestions,
            ResolutionError::NoVersionMatch { .. } | ResolutionError::AmbiguousCatalog { .. } => &[],
        }
    }
}

fn did_you_mean(suggestions: &[String]) -> Option<String> {
    match suggestions {
        [] => None,
        [only] => Some(format!("did you mean `{only}`?")),
        many => Some(format!(
            "did you mean one of: {}?",
            many.iter()
                .map(|s| format!("`{s}`"))
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

// ============================================================================
// LOADING ERRORS
// ============================================================================

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("failed to read catalog `{path}`")]
    #[diagnostic(code(buildscope::catalog::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog")]
    #[diagnostic(
        code(buildscope::catalog::decode),
        help("expected {{ \"builders\": [...], \"default_version\": \"...\" }}")
    )]
    Decode {
        #[from]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read configuration `{path}`")]
    #[diagnostic(code(buildscope::config::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML configuration")]
    #[diagnostic(code(buildscope::config::yaml))]
    Yaml {
        #[from]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON configuration")]
    #[diagnostic(code(buildscope::config::json))]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("unsupported configuration format `{extension}`")]
    #[diagnostic(
        code(buildscope::config::format),
        help("use a .yaml, .yml or .json file")
    )]
    UnsupportedFormat { extension: String },
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Renders any diagnostic as a miette report string.
pub fn render<D>(diagnostic: D) -> String
where
    D: Diagnostic + Send + Sync + 'static,
{
    format!("{:?}", miette::Report::new(diagnostic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ambiguity_is_hard() {
        let unknown = ResolutionError::unknown_builder("x", vec![]);
        let no_match = ResolutionError::no_version_match("x", "1", Some("1.0.0".into()), vec![]);
        let ambiguous = ResolutionError::ambiguous("x", "1.0.0", vec![]);
        assert!(!unknown.is_hard());
        assert!(!no_match.is_hard());
        assert!(ambiguous.is_hard());
    }

    #[test]
    fn unknown_builder_help_lists_suggestions() {
        let err = ResolutionError::unknown_builder("subchunkabel", vec!["subchunkable".into()]);
        let rendered = render(err);
        assert!(rendered.contains("buildscope::resolve::unknown_builder"));
        assert!(rendered.contains("did you mean `subchunkable`?"));
    }

    #[test]
    fn malformed_version_help_mentions_format() {
        let err = ResolutionError::no_version_match(
            "x",
            "latest",
            None,
            vec![CandidateRange {
                name: "x".into(),
                version_spec: Some(">=0.1.0".into()),
            }],
        );
        let rendered = render(err);
        assert!(rendered.contains("is not a version"));
        assert!(rendered.contains("x (>=0.1.0)"));
    }

    #[test]
    fn advisory_display_includes_position() {
        let advisory = Advisory::invalid_parameter_name("1bad", Some(Position::new(4, 3)));
        assert_eq!(advisory.to_string(), "4:3: skipping invalid parameter name `1bad`");
    }
}
