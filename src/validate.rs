//! # Spec Validation
//!
//! Joins a [`ScopeReport`] with a catalog snapshot. Every context is
//! resolved to one definition and its owned parameters are checked against
//! that definition's schema.
//!
//! Findings are advisory. The only hard failure is an ambiguous catalog,
//! which means the catalog itself is broken and no finding can be trusted.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::catalog::definition::{BuilderDefinition, ParameterSpec};
use crate::catalog::suggest::suggest;
use crate::catalog::{resolve_with, BuilderCatalog};
use crate::config::{EngineConfig, SuggestionConfig, TagConfig};
use crate::diagnostics::{ResolutionError, Severity};
use crate::scope::{Context, Parameter, ScopeReport, ValueKind};
use crate::syntax::Position;

// ============================================================================
// FINDINGS
// ============================================================================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    UnknownBuilder,
    NoVersionMatch,
    UnknownParameter,
    MissingParameter,
    TypeMismatch,
}

/// One validator result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub line: usize,
    pub column: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// Builder type of the context the finding belongs to.
    pub builder: String,
}

impl Finding {
    fn new(
        kind: FindingKind,
        severity: Severity,
        at: Position,
        builder: &str,
        message: String,
    ) -> Self {
        Self {
            kind,
            severity,
            line: at.line,
            column: at.column,
            message,
            suggestions: Vec::new(),
            builder: builder.to_string(),
        }
    }

    fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}: {}", self.line, self.column, self.severity, self.message)?;
        if !self.suggestions.is_empty() {
            write!(f, " (did you mean {}?)", self.suggestions.join(", "))?;
        }
        Ok(())
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

pub struct Validator<'a> {
    catalog: &'a BuilderCatalog,
    suggestions: SuggestionConfig,
    tags: TagConfig,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a BuilderCatalog) -> Self {
        Self {
            catalog,
            suggestions: SuggestionConfig::default(),
            tags: TagConfig::default(),
        }
    }

    pub fn with_config(catalog: &'a BuilderCatalog, config: &EngineConfig) -> Self {
        Self {
            catalog,
            suggestions: config.suggestions,
            tags: config.tags.clone(),
        }
    }

    /// Checks every context of `report`, returning findings sorted by
    /// position.
    pub fn validate(&self, report: &ScopeReport) -> Result<Vec<Finding>, ResolutionError> {
        let mut findings = Vec::new();
        for (index, context) in report.contexts.iter().enumerate() {
            let owned: Vec<&Parameter> = report.owned_parameters(index).collect();
            self.validate_context(context, &owned, &mut findings)?;
        }
        findings.sort_by_key(|f| (f.line, f.column));
        Ok(findings)
    }

    fn validate_context(
        &self,
        context: &Context,
        owned: &[&Parameter],
        findings: &mut Vec<Finding>,
    ) -> Result<(), ResolutionError> {
        // An untagged version was filled in with the scoping default; let the
        // catalog apply its own. External reports do not say whether the tag
        // was present, so the default value stands in for "absent" there.
        let tagged = context
            .version_tagged
            .unwrap_or(context.version != self.tags.default_version);
        let requested = tagged.then_some(context.version.as_str());

        let definition = match resolve_with(
            self.catalog,
            &context.type_name,
            requested,
            &self.suggestions,
        ) {
            Ok(definition) => definition,
            Err(err) if err.is_hard() => return Err(err),
            Err(err) => {
                findings.push(resolution_finding(context, err));
                return Ok(());
            }
        };
        debug!(builder = %context.type_name, definition = %definition.name, "context resolved");

        for parameter in owned {
            if parameter.name == self.tags.mode_marker {
                continue;
            }
            match definition.parameter(&parameter.name) {
                Some(spec) => findings.extend(type_mismatch(context, parameter, spec)),
                None if definition.accepts_arbitrary_parameters() => {}
                None => findings.push(self.unknown_parameter(context, parameter, &definition)),
            }
        }

        for spec in definition.parameters.iter().filter(|p| p.is_required()) {
            if !owned.iter().any(|p| p.name == spec.name) {
                findings.push(Finding::new(
                    FindingKind::MissingParameter,
                    Severity::Error,
                    context.position(),
                    &context.type_name,
                    format!(
                        "missing required parameter `{}` for `{}`",
                        spec.name, definition.name
                    ),
                ));
            }
        }
        Ok(())
    }

    fn unknown_parameter(
        &self,
        context: &Context,
        parameter: &Parameter,
        definition: &BuilderDefinition,
    ) -> Finding {
        let found = suggest(
            &parameter.name,
            definition.parameter_names(),
            self.suggestions.parameter_distance,
            self.suggestions.max_suggestions,
        );
        Finding::new(
            FindingKind::UnknownParameter,
            Severity::Error,
            Position::new(parameter.line, parameter.column),
            &context.type_name,
            format!(
                "unknown parameter `{}` for `{}`",
                parameter.name, definition.name
            ),
        )
        .with_suggestions(found)
    }
}

fn resolution_finding(context: &Context, err: ResolutionError) -> Finding {
    let kind = match &err {
        ResolutionError::NoVersionMatch { .. } => FindingKind::NoVersionMatch,
        _ => FindingKind::UnknownBuilder,
    };
    let suggestions = err.suggestions().to_vec();
    let message = match &err {
        ResolutionError::NoVersionMatch { candidates, .. } if !candidates.is_empty() => format!(
            "{err}; tried {}",
            candidates
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        _ => err.to_string(),
    };
    Finding::new(kind, Severity::Error, context.position(), &context.type_name, message)
        .with_suggestions(suggestions)
}

// ============================================================================
// TYPE CHECKS
// ============================================================================

fn type_mismatch(context: &Context, parameter: &Parameter, spec: &ParameterSpec) -> Option<Finding> {
    let actual = parameter.value_kind?;
    // A nested record may be another builder producing any type.
    if actual == ValueKind::Record {
        return None;
    }
    let accepted = accepted_kinds(&spec.type_name)?;
    if accepted.contains(&actual) {
        return None;
    }
    Some(Finding::new(
        FindingKind::TypeMismatch,
        Severity::Warning,
        Position::new(parameter.line, parameter.column),
        &context.type_name,
        format!(
            "parameter `{}` expects `{}` but is given a {}",
            parameter.name, spec.type_name, actual
        ),
    ))
}

/// Value kinds a declared type admits, or `None` when the type is not one
/// of the simple ones.
fn accepted_kinds(declared: &str) -> Option<Vec<ValueKind>> {
    let declared = declared.trim();
    let declared = declared.strip_prefix("typing.").unwrap_or(declared);

    if let Some(inner) = declared
        .strip_prefix("Optional[")
        .and_then(|rest| rest.strip_suffix(']'))
    {
        let mut kinds = accepted_kinds(inner)?;
        kinds.push(ValueKind::Null);
        return Some(kinds);
    }

    let base = declared.split('[').next().unwrap_or(declared);
    let kinds = match base {
        "int" | "float" => vec![ValueKind::Number],
        "str" => vec![ValueKind::String],
        "bool" => vec![ValueKind::Bool],
        "None" | "NoneType" => vec![ValueKind::Null],
        "list" | "List" | "Sequence" | "tuple" | "Tuple" => vec![ValueKind::List],
        "dict" | "Dict" | "Mapping" => vec![ValueKind::Record],
        _ => return None,
    };
    Some(kinds)
}
