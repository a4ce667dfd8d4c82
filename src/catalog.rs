//! # Builder Catalog
//!
//! The set of builder definitions documents are validated against, and the
//! version resolution that picks exactly one of them for an invocation.
//!
//! A builder usually has several definitions, one per supported version
//! range. Generated catalogs encode the range in the name of older entries
//! (`build_cv_v0_1_0`, `build_cv_vlt0_2_0`), so definitions are grouped by
//! their name with that suffix stripped.
//!
//! ## Snapshots
//!
//! A loaded [`BuilderCatalog`] is never mutated. [`CatalogHandle`] holds the
//! current one behind an `Arc`; readers take a snapshot and keep resolving
//! against it while a reload swaps in a replacement.
//!
//! ## Module Structure
//!
//! - **`definition`**: catalog entries and their parameter schemas
//! - **`loader`**: JSON decoding
//! - **`version`**: version normalization and the range grammar
//! - **`resolver`**: exactly-one-match resolution
//! - **`suggest`**: edit-distance suggestions

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{CatalogError, ResolutionError};

pub mod definition;
pub mod loader;
pub mod resolver;
pub mod suggest;
pub mod version;

pub use definition::{BuilderDefinition, ParameterSpec};
pub use loader::{load_catalog, parse_catalog};
pub use resolver::{resolve, resolve_with};
pub use version::{normalize, Version, VersionReq};

static VERSION_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"_v(?:\d+(?:_\d+)*|(?:gt|lt|eq|~|!)[0-9a-z_,~!*. ]*)$")
        .expect("version suffix pattern is valid")
});

/// Removes a generated version suffix: `build_cv_v0_1_0` is `build_cv`.
pub fn strip_version_suffix(name: &str) -> &str {
    match VERSION_SUFFIX.find(name) {
        Some(m) if m.start() > 0 => &name[..m.start()],
        _ => name,
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// A problem found while loading that did not stop the load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIssue {
    pub builder: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct BuilderCatalog {
    definitions: im::Vector<Arc<BuilderDefinition>>,
    by_base: im::HashMap<String, im::Vector<Arc<BuilderDefinition>>>,
    by_raw: im::HashMap<String, Arc<BuilderDefinition>>,
    default_version: String,
    issues: Vec<CatalogIssue>,
}

impl BuilderCatalog {
    pub fn new(
        definitions: impl IntoIterator<Item = BuilderDefinition>,
        default_version: impl Into<String>,
    ) -> Self {
        let catalog = Self {
            default_version: default_version.into(),
            ..Self::default()
        };
        definitions
            .into_iter()
            .fold(catalog, |catalog, definition| catalog.with_definition(definition))
    }

    /// A copy of this catalog with one more definition. Unchanged entries
    /// are shared with `self`.
    pub fn with_definition(&self, definition: BuilderDefinition) -> Self {
        let definition = Arc::new(definition);
        let base = definition.base_name().to_string();

        let mut next = self.clone();
        next.definitions.push_back(Arc::clone(&definition));
        next.by_base
            .entry(base)
            .or_insert_with(im::Vector::new)
            .push_back(Arc::clone(&definition));
        next.by_raw.insert(definition.name.clone(), definition);
        next
    }

    pub fn with_issues(mut self, issues: Vec<CatalogIssue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    pub fn issues(&self) -> &[CatalogIssue] {
        &self.issues
    }

    /// All definitions in load order.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<BuilderDefinition>> {
        self.definitions.iter()
    }

    /// Distinct base names, sorted.
    pub fn base_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_base.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Definitions a requested name may refer to: every entry sharing its
    /// base name, plus an entry whose raw name is exactly `name`.
    pub fn candidates(&self, name: &str) -> Vec<Arc<BuilderDefinition>> {
        let mut found: Vec<Arc<BuilderDefinition>> = self
            .by_base
            .get(strip_version_suffix(name))
            .map(|group| group.iter().cloned().collect())
            .unwrap_or_default();
        if let Some(exact) = self.by_raw.get(name) {
            if !found.iter().any(|d| Arc::ptr_eq(d, exact)) {
                found.push(Arc::clone(exact));
            }
        }
        found
    }

    pub fn resolve(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Arc<BuilderDefinition>, ResolutionError> {
        resolve(self, name, version)
    }
}

// ============================================================================
// SNAPSHOT HANDLE
// ============================================================================

/// Shared access to the current catalog.
#[derive(Debug, Default)]
pub struct CatalogHandle {
    current: RwLock<Arc<BuilderCatalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: BuilderCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// The catalog as of now. Later replacements do not affect it.
    pub fn snapshot(&self) -> Arc<BuilderCatalog> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Installs `catalog` and returns the previous snapshot.
    pub fn replace(&self, catalog: BuilderCatalog) -> Arc<BuilderCatalog> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(catalog))
    }

    /// Loads `path` and installs it. On error the current catalog stays.
    pub fn reload_from_path(&self, path: &Path) -> Result<Arc<BuilderCatalog>, CatalogError> {
        let catalog = load_catalog(path)?;
        self.replace(catalog);
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, spec: &str) -> BuilderDefinition {
        BuilderDefinition::new(name, Some(spec), vec![]).unwrap()
    }

    #[test]
    fn strips_generated_suffixes() {
        assert_eq!(strip_version_suffix("build_cv_v0_1_0"), "build_cv");
        assert_eq!(strip_version_suffix("build_cv_v2"), "build_cv");
        assert_eq!(strip_version_suffix("build_cv_vlt0_2_0"), "build_cv");
        assert_eq!(strip_version_suffix("build_cv_vgteq0_1_0,lt0_2_0"), "build_cv");
        assert_eq!(strip_version_suffix("build_cv"), "build_cv");
        assert_eq!(strip_version_suffix("build_v2_op"), "build_v2_op");
        assert_eq!(strip_version_suffix("_v1"), "_v1");
    }

    #[test]
    fn groups_by_base_name() {
        let catalog = BuilderCatalog::new(
            [def("x_v0_1_0", "==0.1.0"), def("x", ">=0.2.0"), def("y", "*")],
            "0.2.0",
        );
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.base_names(), vec!["x", "y"]);
        assert_eq!(catalog.candidates("x").len(), 2);
        assert_eq!(catalog.candidates("x_v0_1_0").len(), 2);
        assert!(catalog.candidates("z").is_empty());
    }

    #[test]
    fn snapshots_survive_replacement() {
        let handle = CatalogHandle::new(BuilderCatalog::new([def("old", "*")], "0.0.0"));
        let before = handle.snapshot();
        let previous = handle.replace(BuilderCatalog::new([def("new", "*")], "0.0.0"));

        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.base_names(), vec!["old"]);
        assert_eq!(handle.snapshot().base_names(), vec!["new"]);
    }

    #[test]
    fn failed_reload_keeps_current_catalog() {
        let handle = CatalogHandle::new(BuilderCatalog::new([def("kept", "*")], "0.0.0"));
        assert!(handle.reload_from_path(Path::new("/no/such/catalog.json")).is_err());
        assert_eq!(handle.snapshot().base_names(), vec!["kept"]);
    }
}
