//! Scan cache: reports keyed by the SHA-256 of the document text.
//!
//! Entries expire after a fixed TTL, so an editor re-scanning the same
//! buffer on every keystroke pays for one parse per window. Failed scans,
//! timeouts included, are never stored.

use std::time::Duration;

use moka::sync::Cache;
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::diagnostics::ScanError;
use crate::scanner::Scanner;
use crate::scope::ScopeReport;

type ContentHash = [u8; 32];

fn content_hash(source: &str) -> ContentHash {
    Sha256::digest(source.as_bytes()).into()
}

pub struct CachedScanner<S> {
    inner: S,
    reports: Cache<ContentHash, ScopeReport>,
}

impl<S: Scanner> CachedScanner<S> {
    pub fn new(inner: S, ttl: Duration, capacity: u64) -> Self {
        Self {
            inner,
            reports: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.reports.run_pending_tasks();
        self.reports.entry_count()
    }
}

impl<S: Scanner> Scanner for CachedScanner<S> {
    fn scan(&self, source: &str) -> Result<ScopeReport, ScanError> {
        let key = content_hash(source);
        if let Some(report) = self.reports.get(&key) {
            trace!("scan cache hit");
            return Ok(report);
        }
        let report = self.inner.scan(source)?;
        self.reports.insert(key, report.clone());
        Ok(report)
    }
}
