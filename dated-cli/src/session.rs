//! Document session: reuses cached documents, loads them on a miss.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use dated_cache::{ExpiringResourceCache, SharedCache};
use dated_core::{CacheConfig, CacheStats, MemoryUsage};

use crate::document::SourceDocument;

/// How a document was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Not cached; read from disk and inserted.
    Loaded,
    /// Cached; re-read in place.
    Reparsed,
}

/// Result of opening one document.
#[derive(Clone, Debug)]
pub struct OpenReport {
    pub key: String,
    pub outcome: OpenOutcome,
    pub lines: usize,
    pub revision: u32,
    pub headline: Option<String>,
}

impl OpenReport {
    fn from_document(key: &str, outcome: OpenOutcome, doc: &SourceDocument) -> Self {
        let headline = (1..=doc.line_count())
            .filter_map(|n| doc.line(n))
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| line.chars().take(60).collect());
        Self {
            key: key.to_string(),
            outcome,
            lines: doc.line_count(),
            revision: doc.revision(),
            headline,
        }
    }
}

/// Caches source documents by path across repeated opens.
///
/// Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct DocumentSession {
    cache: SharedCache<SourceDocument>,
    released: Arc<AtomicU64>,
}

impl DocumentSession {
    /// Creates a session whose cache uses `config`.
    pub fn new(config: CacheConfig) -> Result<Self> {
        let mut cache: ExpiringResourceCache<SourceDocument> = ExpiringResourceCache::with_config(config)
            .context("invalid cache configuration")?;

        let released = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&released);
        cache.set_purge_callback(move |key: String, doc: SourceDocument| {
            debug!(key = %key, path = %doc.path().display(), revision = doc.revision(), "Released document");
            counter.fetch_add(1, Ordering::Relaxed);
        });

        Ok(Self {
            cache: SharedCache::new(cache),
            released,
        })
    }

    /// Opens `path`, reusing the cached document when there is one.
    ///
    /// A cached document that can no longer be read is evicted and the error
    /// returned.
    pub fn open(&self, path: &Path) -> Result<OpenReport> {
        let key = path.display().to_string();

        let cached = self.cache.with_resource(&key, |doc| {
            doc.reload()
                .map(|()| OpenReport::from_document(&key, OpenOutcome::Reparsed, doc))
        });
        match cached {
            Ok(Ok(report)) => return Ok(report),
            Ok(Err(err)) => {
                self.cache.remove(&key);
                return Err(err).with_context(|| format!("failed to re-read {key}"));
            }
            Err(err) if err.is_recoverable() => {}
            Err(err) => return Err(err.into()),
        }

        let doc = SourceDocument::load(path).with_context(|| format!("failed to load {key}"))?;
        let report = OpenReport::from_document(&key, OpenOutcome::Loaded, &doc);
        info!(key = %key, lines = report.lines, "Loaded document");
        self.cache.insert(key, doc);
        Ok(report)
    }

    /// Drops one document, or every document when `path` is `None`.
    pub fn clear_cache(&self, path: Option<&Path>) -> usize {
        match path {
            Some(path) => usize::from(self.cache.remove(&path.display().to_string())),
            None => self.cache.clear(),
        }
    }

    /// Returns the idle time before documents expire.
    pub fn expiration(&self) -> u64 {
        self.cache.with(|cache| cache.expiration())
    }

    /// Per-document memory footprint, sorted by path.
    pub fn memory_usage(&self) -> Vec<MemoryUsage> {
        self.cache.with(|cache| cache.memory_usage())
    }

    /// Number of documents released so far.
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    /// Cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
