//! # Scanners
//!
//! A [`Scanner`] turns document text into a [`ScopeReport`]. Three are
//! provided and compose freely:
//!
//! - [`TreeScanner`]: parses in process and runs the scoping passes
//! - [`ExternalScanner`]: delegates to a command speaking the scope-report
//!   JSON format, with a bounded wait
//! - [`CachedScanner`]: memoises any scanner by content hash for a short TTL
//!
//! Callers that want the fail-open behaviour (a timed-out scan is an empty
//! report, not an error) go through [`scan_or_empty`].

use tracing::{debug, warn};

use crate::config::{EngineConfig, TagConfig};
use crate::diagnostics::ScanError;
use crate::scope::{analyze, ScopeReport};
use crate::syntax::{RecordParser, StructuralParser};

pub mod cache;
pub mod external;

pub use cache::CachedScanner;
pub use external::ExternalScanner;

pub trait Scanner: Send + Sync {
    fn scan(&self, source: &str) -> Result<ScopeReport, ScanError>;
}

impl<S: Scanner + ?Sized> Scanner for Box<S> {
    fn scan(&self, source: &str) -> Result<ScopeReport, ScanError> {
        (**self).scan(source)
    }
}

impl<S: Scanner + ?Sized> Scanner for std::sync::Arc<S> {
    fn scan(&self, source: &str) -> Result<ScopeReport, ScanError> {
        (**self).scan(source)
    }
}

// ============================================================================
// IN-PROCESS SCANNER
// ============================================================================

/// Parses with a [`StructuralParser`] and scopes the resulting tree.
#[derive(Debug, Clone)]
pub struct TreeScanner<P = RecordParser> {
    parser: P,
    tags: TagConfig,
}

impl<P: StructuralParser> TreeScanner<P> {
    pub fn new(parser: P, tags: TagConfig) -> Self {
        Self { parser, tags }
    }
}

impl TreeScanner<RecordParser> {
    pub fn with_tags(tags: TagConfig) -> Self {
        Self::new(RecordParser, tags)
    }
}

impl Default for TreeScanner<RecordParser> {
    fn default() -> Self {
        Self::with_tags(TagConfig::default())
    }
}

impl<P: StructuralParser> Scanner for TreeScanner<P> {
    fn scan(&self, source: &str) -> Result<ScopeReport, ScanError> {
        let document = self.parser.parse(source)?;
        if document.is_partial() {
            debug!(
                recovered = document.diagnostics.len(),
                "document parsed with recoverable errors"
            );
        }
        Ok(analyze(&document, &self.tags))
    }
}

// ============================================================================
// POLICY AND CONSTRUCTION
// ============================================================================

/// Scans `source`, turning a timeout into an empty report.
pub fn scan_or_empty(scanner: &dyn Scanner, source: &str) -> Result<ScopeReport, ScanError> {
    match scanner.scan(source) {
        Err(ScanError::Timeout { elapsed_ms }) => {
            warn!(elapsed_ms, "structural parser timed out; continuing without scope information");
            Ok(ScopeReport::default())
        }
        other => other,
    }
}

/// The scanner described by `config`: external when a command is set,
/// in process otherwise, cached unless the TTL is zero.
pub fn scanner_from_config(config: &EngineConfig) -> Box<dyn Scanner> {
    let parser = &config.parser;
    let inner: Box<dyn Scanner> = match parser.command.as_deref() {
        Some([program, args @ ..]) => Box::new(ExternalScanner::new(
            program.clone(),
            args.to_vec(),
            parser.timeout(),
        )),
        _ => Box::new(TreeScanner::with_tags(config.tags.clone())),
    };

    if parser.cache_ttl_ms == 0 || parser.cache_capacity == 0 {
        inner
    } else {
        Box::new(CachedScanner::new(inner, parser.cache_ttl(), parser.cache_capacity))
    }
}
