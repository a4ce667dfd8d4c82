//! Catalog entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::strip_version_suffix;
use crate::catalog::version::{RangeError, Version, VersionReq};
use crate::diagnostics::CandidateRange;

/// Python-style parameter kinds that never name a single field.
const VAR_POSITIONAL: &str = "VAR_POSITIONAL";
const VAR_KEYWORD: &str = "VAR_KEYWORD";

fn any_type() -> String {
    "Any".to_string()
}

/// One declared parameter of a builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type", default = "any_type")]
    pub type_name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    /// `POSITIONAL_OR_KEYWORD`, `KEYWORD_ONLY`, `VAR_KEYWORD`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ParameterSpec {
    pub fn new(name: &str, type_name: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            required,
            default: None,
            kind: None,
        }
    }

    /// `*args` / `**kwargs` style entries.
    pub fn is_variadic(&self) -> bool {
        matches!(self.kind.as_deref(), Some(VAR_POSITIONAL | VAR_KEYWORD))
    }

    pub fn accepts_arbitrary_names(&self) -> bool {
        self.kind.as_deref() == Some(VAR_KEYWORD)
    }

    /// Required and without a default value.
    pub fn is_required(&self) -> bool {
        self.required && self.default.is_none() && !self.is_variadic()
    }
}

/// One version-range-scoped schema of a builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderDefinition {
    pub name: String,
    #[serde(default)]
    pub version_spec: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    #[serde(skip)]
    range: Option<VersionReq>,
}

impl BuilderDefinition {
    /// Builds a definition and compiles its range.
    pub fn new(
        name: &str,
        version_spec: Option<&str>,
        parameters: Vec<ParameterSpec>,
    ) -> Result<Self, RangeError> {
        let mut definition = Self {
            name: name.to_string(),
            version_spec: version_spec.map(str::to_string),
            parameters,
            metadata: Value::Null,
            range: None,
        };
        definition.compile_range()?;
        Ok(definition)
    }

    /// Compiles `version_spec`. On error the definition keeps no range and
    /// never matches.
    pub fn compile_range(&mut self) -> Result<(), RangeError> {
        self.range = None;
        if let Some(spec) = &self.version_spec {
            self.range = Some(VersionReq::parse(spec)?);
        }
        Ok(())
    }

    pub fn range(&self) -> Option<&VersionReq> {
        self.range.as_ref()
    }

    pub fn accepts(&self, version: &Version) -> bool {
        self.range
            .as_ref()
            .is_some_and(|range| range.matches(version))
    }

    pub fn base_name(&self) -> &str {
        strip_version_suffix(&self.name)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters
            .iter()
            .find(|p| p.name == name && !p.is_variadic())
    }

    /// Names a document may use, in declaration order.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| !p.is_variadic())
            .map(|p| p.name.as_str())
    }

    pub fn accepts_arbitrary_parameters(&self) -> bool {
        self.parameters.iter().any(ParameterSpec::accepts_arbitrary_names)
    }

    pub fn candidate(&self) -> CandidateRange {
        CandidateRange {
            name: self.name.clone(),
            version_spec: self.version_spec.clone(),
        }
    }
}
