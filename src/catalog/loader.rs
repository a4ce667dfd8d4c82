//! Catalog loading from the builder metadata JSON format.
//!
//! ```json
//! {
//!   "builders": [
//!     {"name": "build_cv", "version_spec": ">=0.2.0",
//!      "parameters": [{"name": "path", "type": "str", "required": true, "default": null}],
//!      "metadata": {}}
//!   ],
//!   "default_version": "0.4.0"
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::catalog::definition::BuilderDefinition;
use crate::catalog::{BuilderCatalog, CatalogIssue};
use crate::diagnostics::CatalogError;

/// Version assumed for requests without one when the catalog names none.
pub const FALLBACK_DEFAULT_VERSION: &str = "0.0.0";

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    builders: Vec<BuilderDefinition>,
    #[serde(default)]
    default_version: Option<String>,
}

/// Decodes a catalog document. Unparsable version ranges do not fail the
/// load; they are recorded as issues and the affected entries never match.
pub fn parse_catalog(content: &str) -> Result<BuilderCatalog, CatalogError> {
    let file: CatalogFile = serde_json::from_str(content)?;
    let mut issues = Vec::new();
    let mut definitions = Vec::with_capacity(file.builders.len());

    for mut definition in file.builders {
        if let Err(err) = definition.compile_range() {
            warn!(builder = %definition.name, error = %err, "ignoring unparsable version range");
            issues.push(CatalogIssue {
                builder: definition.name.clone(),
                message: err.to_string(),
            });
        }
        definitions.push(definition);
    }

    let default_version = file
        .default_version
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_DEFAULT_VERSION.to_string());

    let catalog = BuilderCatalog::new(definitions, default_version).with_issues(issues);
    info!(
        builders = catalog.len(),
        names = catalog.base_names().len(),
        issues = catalog.issues().len(),
        default_version = %catalog.default_version(),
        "catalog loaded"
    );
    Ok(catalog)
}

pub fn load_catalog(path: &Path) -> Result<BuilderCatalog, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_catalog(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_version_falls_back() {
        let catalog = parse_catalog(r#"{"builders": []}"#).unwrap();
        assert_eq!(catalog.default_version(), "0.0.0");
        assert!(catalog.is_empty());
    }

    #[test]
    fn bad_ranges_become_issues() {
        let catalog = parse_catalog(
            r#"{"builders": [
                {"name": "a", "version_spec": "not a range", "parameters": []},
                {"name": "b", "version_spec": ">=0.1.0", "parameters": []}
            ], "default_version": "0.1.0"}"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.issues().len(), 1);
        assert_eq!(catalog.issues()[0].builder, "a");
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(matches!(
            parse_catalog("{\"builders\": 3}"),
            Err(CatalogError::Decode { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_catalog(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
