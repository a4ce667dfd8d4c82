//! # Structural Scoping
//!
//! Turns a parsed document into a [`ScopeReport`]: the builder invocations
//! (contexts) it contains and the parameters each of them owns.
//!
//! ## Ownership
//!
//! A record literal carrying the type tag is a context. Its parameters are
//! its *direct* fields, never the fields of nested records. A nested record
//! with its own type tag is a context of its own, so its fields cannot leak
//! to the outer invocation:
//!
//! ```cue
//! job: {
//!     "@type": "outer"
//!     a: 1                    // outer
//!     inner: {
//!         "@type": "nested"
//!         b: 2                // nested
//!     }
//! }
//! ```
//!
//! The one positional exception: a field written on the same line as a type
//! tag but before it belongs to the nearest enclosing context.
//!
//! ## Module Structure
//!
//! - **`extractor`**: finds context-bearing records in document order
//! - **`scoper`**: assigns direct fields to their owning context
//! - **`names`**: reserved, private and invalid field names

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::TagConfig;
use crate::diagnostics::Advisory;
use crate::syntax::{LiteralKind, Node, ParsedDocument, Position};

pub mod extractor;
pub mod names;
pub mod scoper;

pub use extractor::{extract_contexts, ExtractedContext};
pub use names::{classify, is_identifier, FieldClass};
pub use scoper::scope_parameters;

// ============================================================================
// REPORT TYPES
// ============================================================================

/// A builder invocation: a record literal carrying the type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    #[serde(rename = "type")]
    pub type_name: String,
    pub version: String,
    /// Whether the record carried its own version tag. `None` for reports
    /// decoded from an external scanner, which do not say.
    #[serde(skip)]
    pub version_tagged: Option<bool>,
    /// Position of the type-tag field.
    pub line: usize,
    pub column: usize,
    /// Line bounds of the owning record.
    pub start_line: usize,
    pub end_line: usize,
}

impl Context {
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn contains_line(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }
}

/// A field owned by a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub line: usize,
    pub column: usize,
    #[serde(alias = "context")]
    pub context_type: String,
    #[serde(alias = "version")]
    pub context_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_kind: Option<ValueKind>,
    /// Index of the owner in [`ScopeReport::contexts`], when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_index: Option<usize>,
}

/// Shape of a parameter's value, when it is plain enough to tell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Bool,
    Null,
    Record,
    List,
}

impl ValueKind {
    pub fn of(node: &Node) -> Option<Self> {
        match node {
            Node::Literal(literal) => Some(match literal.kind {
                LiteralKind::String => ValueKind::String,
                LiteralKind::Number => ValueKind::Number,
                LiteralKind::Bool => ValueKind::Bool,
                LiteralKind::Null => ValueKind::Null,
            }),
            Node::Record(_) => Some(ValueKind::Record),
            Node::List(_) => Some(ValueKind::List),
            Node::Field(_) | Node::Identifier(_) | Node::Expression(_) | Node::Missing(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Bool => "bool",
            ValueKind::Null => "null",
            ValueKind::Record => "record",
            ValueKind::List => "list",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scanning one document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScopeReport {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contexts: Vec<Context>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Advisory>,
}

impl ScopeReport {
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.contexts.is_empty()
    }

    /// Index of the context owning `parameter`.
    ///
    /// Reports built in process record the owner directly. Reports decoded
    /// from an external scanner only carry the owner's type and version, so
    /// the innermost context with that identity spanning the parameter's line
    /// is used instead.
    pub fn owner_of(&self, parameter: &Parameter) -> Option<usize> {
        if let Some(index) = parameter.context_index {
            return (index < self.contexts.len()).then_some(index);
        }
        self.contexts
            .iter()
            .enumerate()
            .filter(|(_, context)| {
                context.type_name == parameter.context_type
                    && context.version == parameter.context_version
                    && context.contains_line(parameter.line)
            })
            .max_by_key(|(_, context)| context.start_line)
            .map(|(index, _)| index)
    }

    /// Parameters owned by the context at `index`, in document order.
    pub fn owned_parameters(&self, index: usize) -> impl Iterator<Item = &Parameter> + '_ {
        self.parameters
            .iter()
            .filter(move |parameter| self.owner_of(parameter) == Some(index))
    }
}

/// Scanners written in Go print `null` for empty lists.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// ANALYSIS
// ============================================================================

/// Builds the scope report of a parsed document.
pub fn analyze(document: &ParsedDocument, tags: &TagConfig) -> ScopeReport {
    let extracted = extract_contexts(&document.root, tags);
    let (parameters, advisories) = scope_parameters(&extracted, tags);

    let mut diagnostics = document.diagnostics.clone();
    diagnostics.extend(advisories);

    ScopeReport {
        parameters,
        contexts: extracted.into_iter().map(|e| e.context).collect(),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(type_name: &str, start_line: usize, end_line: usize) -> Context {
        Context {
            type_name: type_name.to_string(),
            version: "0.0.0".to_string(),
            version_tagged: Some(false),
            line: start_line + 1,
            column: 3,
            start_line,
            end_line,
        }
    }

    #[test]
    fn external_reports_fall_back_to_innermost_context() {
        let json = r#"{
            "parameters": [{"name": "x", "line": 5, "column": 5, "context": "a", "version": "0.0.0"}],
            "contexts": [
                {"type": "a", "version": "0.0.0", "line": 2, "column": 3, "start_line": 1, "end_line": 10},
                {"type": "a", "version": "0.0.0", "line": 5, "column": 3, "start_line": 4, "end_line": 6}
            ]
        }"#;
        let report: ScopeReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.parameters[0].context_type, "a");
        assert_eq!(report.owner_of(&report.parameters[0]), Some(1));
        assert_eq!(report.owned_parameters(0).count(), 0);
    }

    #[test]
    fn serialized_report_omits_unknown_fields() {
        let report = ScopeReport {
            parameters: vec![Parameter {
                name: "x".into(),
                line: 2,
                column: 3,
                context_type: "a".into(),
                context_version: "0.0.0".into(),
                value_kind: None,
                context_index: None,
            }],
            contexts: vec![context("a", 1, 3)],
            diagnostics: vec![],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("diagnostics").is_none());
        assert!(value["parameters"][0].get("value_kind").is_none());
        assert_eq!(value["contexts"][0]["type"], "a");
        assert_eq!(value["parameters"][0]["context_type"], "a");
    }

    #[test]
    fn null_lists_decode_as_empty() {
        let report: ScopeReport =
            serde_json::from_str(r#"{"parameters": null, "contexts": null}"#).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn contains_line_is_inclusive() {
        let ctx = context("a", 3, 7);
        assert!(ctx.contains_line(3));
        assert!(ctx.contains_line(7));
        assert!(!ctx.contains_line(8));
    }
}
