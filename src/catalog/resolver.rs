//! Version resolution.
//!
//! A request resolves only when exactly one definition of the builder accepts
//! the requested version. Overlapping ranges are a catalog defect and are
//! reported as [`ResolutionError::AmbiguousCatalog`] instead of being settled
//! by load order.

use std::sync::Arc;

use tracing::debug;

use crate::catalog::definition::BuilderDefinition;
use crate::catalog::suggest::suggest;
use crate::catalog::version::normalize;
use crate::catalog::{strip_version_suffix, BuilderCatalog};
use crate::config::SuggestionConfig;
use crate::diagnostics::{CandidateRange, ResolutionError};

/// Resolves with the default suggestion thresholds.
pub fn resolve(
    catalog: &BuilderCatalog,
    name: &str,
    version: Option<&str>,
) -> Result<Arc<BuilderDefinition>, ResolutionError> {
    resolve_with(catalog, name, version, &SuggestionConfig::default())
}

/// Resolves `name` at `version`; a missing or blank version means the
/// catalog's default version.
pub fn resolve_with(
    catalog: &BuilderCatalog,
    name: &str,
    version: Option<&str>,
    suggestions: &SuggestionConfig,
) -> Result<Arc<BuilderDefinition>, ResolutionError> {
    let candidates = catalog.candidates(name);
    if candidates.is_empty() {
        let found = suggest(
            strip_version_suffix(name),
            catalog.base_names(),
            suggestions.builder_distance,
            suggestions.max_suggestions,
        );
        debug!(builder = %name, suggestions = ?found, "unknown builder");
        return Err(ResolutionError::unknown_builder(name, found));
    }

    let requested = version
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(catalog.default_version());

    let Some(normalized) = normalize(requested) else {
        debug!(builder = %name, version = %requested, "requested version is malformed");
        return Err(ResolutionError::no_version_match(
            name,
            requested,
            None,
            ranges(&candidates),
        ));
    };

    let mut matching: Vec<Arc<BuilderDefinition>> = candidates
        .iter()
        .filter(|definition| definition.accepts(&normalized))
        .cloned()
        .collect();

    match matching.len() {
        0 => Err(ResolutionError::no_version_match(
            name,
            requested,
            Some(normalized.to_string()),
            ranges(&candidates),
        )),
        1 => Ok(matching.remove(0)),
        _ => Err(ResolutionError::ambiguous(
            name,
            &normalized.to_string(),
            ranges(&matching),
        )),
    }
}

fn ranges(definitions: &[Arc<BuilderDefinition>]) -> Vec<CandidateRange> {
    definitions.iter().map(|d| d.candidate()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(entries: &[(&str, Option<&str>)]) -> BuilderCatalog {
        BuilderCatalog::new(
            entries
                .iter()
                .map(|(name, spec)| BuilderDefinition::new(name, *spec, vec![]).unwrap()),
            "0.4.0",
        )
    }

    #[test]
    fn blank_version_uses_catalog_default() {
        let catalog = catalog(&[("x_v0_1_0", Some(">=0.1.0 <0.2.0")), ("x", Some(">=0.2.0"))]);
        assert_eq!(resolve(&catalog, "x", None).unwrap().name, "x");
        assert_eq!(resolve(&catalog, "x", Some("  ")).unwrap().name, "x");
    }

    #[test]
    fn entries_without_range_never_match() {
        let catalog = catalog(&[("x", None)]);
        let err = resolve(&catalog, "x", Some("1.0.0")).unwrap_err();
        assert!(matches!(err, ResolutionError::NoVersionMatch { .. }));
    }

    #[test]
    fn malformed_version_lists_candidates() {
        let catalog = catalog(&[("x", Some("*"))]);
        match resolve(&catalog, "x", Some("latest")).unwrap_err() {
            ResolutionError::NoVersionMatch {
                normalized,
                candidates,
                ..
            } => {
                assert_eq!(normalized, None);
                assert_eq!(candidates.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
