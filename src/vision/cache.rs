//! Description cache: remember what the vision model said about an image.
//!
//! Vision calls are slow and billed; the same image frequently appears in
//! repeated uploads of the same document. The cache is keyed by a content
//! hash of the image bytes (computed by the client, never by the extraction
//! core) and injected into [`crate::vision::VisionClient`] as a trait object,
//! so tests run without filesystem side effects.
//!
//! Contract: `get` and `put` are in-memory and infallible; `flush` persists
//! whatever the implementation persists. The client flushes after every new
//! analysis, preserving the write-through lifecycle of the original service.

use crate::error::DocVisionError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// One cached analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDescription {
    /// The model's textual description.
    pub description: String,
    /// Unix epoch seconds when the entry was stored.
    pub stored_at_secs: u64,
    /// Size of the image bytes the description was computed from.
    pub source_bytes: usize,
}

impl CachedDescription {
    pub fn new(description: impl Into<String>, source_bytes: usize) -> Self {
        Self {
            description: description.into(),
            stored_at_secs: now_secs(),
            source_bytes,
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Injected cache dependency with a `{get, put, flush}` contract.
pub trait DescriptionCache: Send + Sync {
    /// Look up a previously stored description by content-hash key.
    fn get(&self, key: &str) -> Option<CachedDescription>;

    /// Store a description under a content-hash key.
    fn put(&self, key: &str, entry: CachedDescription);

    /// Persist the cache. A no-op for purely in-memory implementations.
    fn flush(&self) -> Result<(), DocVisionError>;
}

/// In-memory cache; state dies with the process. Used in tests and for
/// callers that handle persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CachedDescription>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DescriptionCache for MemoryCache {
    fn get(&self, key: &str) -> Option<CachedDescription> {
        match self.entries.read() {
            Ok(entries) => entries.get(key).cloned(),
            Err(_) => None,
        }
    }

    fn put(&self, key: &str, entry: CachedDescription) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), entry);
        }
    }

    fn flush(&self) -> Result<(), DocVisionError> {
        Ok(())
    }
}

/// JSON-file-backed cache: load at startup, mutate in memory, persist on
/// [`DescriptionCache::flush`].
///
/// Loading is tolerant — a missing or unreadable file starts the cache
/// empty with a logged warning rather than failing the service.
#[derive(Debug)]
pub struct JsonFileCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, CachedDescription>>,
}

impl JsonFileCache {
    /// Open a cache file, loading any existing entries.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, CachedDescription>>(&bytes)
            {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cache file unreadable; starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache file unreadable; starting empty");
                HashMap::new()
            }
        };
        info!(path = %path.display(), entries = entries.len(), "description cache loaded");
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DescriptionCache for JsonFileCache {
    fn get(&self, key: &str) -> Option<CachedDescription> {
        match self.entries.read() {
            Ok(entries) => entries.get(key).cloned(),
            Err(_) => None,
        }
    }

    fn put(&self, key: &str, entry: CachedDescription) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), entry);
        }
    }

    fn flush(&self) -> Result<(), DocVisionError> {
        let snapshot = match self.entries.read() {
            Ok(entries) => entries.clone(),
            Err(_) => return Ok(()),
        };
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| DocVisionError::Internal(format!("cache serialisation: {e}")))?;
        std::fs::write(&self.path, json).map_err(|source| DocVisionError::CacheWriteFailed {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_cache_round_trip() {
        let cache = MemoryCache::new();
        assert!(cache.get("k").is_none());
        cache.put("k", CachedDescription::new("a bar chart", 123));
        let hit = cache.get("k").expect("hit");
        assert_eq!(hit.description, "a bar chart");
        assert_eq!(hit.source_bytes, 123);
        cache.flush().expect("noop flush");
    }

    #[test]
    fn json_cache_missing_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = JsonFileCache::load(dir.path().join("vision_cache.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn json_cache_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vision_cache.json");
        std::fs::write(&path, b"{ not json").expect("write");
        let cache = JsonFileCache::load(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn json_cache_flush_and_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vision_cache.json");

        let cache = JsonFileCache::load(&path);
        cache.put("abc123", CachedDescription::new("pie chart of fees", 4096));
        cache.flush().expect("flush");

        let reloaded = JsonFileCache::load(&path);
        assert_eq!(reloaded.len(), 1);
        let hit = reloaded.get("abc123").expect("hit");
        assert_eq!(hit.description, "pie chart of fees");
        assert_eq!(hit.source_bytes, 4096);
    }

    #[test]
    fn json_cache_flush_to_unwritable_path_errors() {
        let cache = JsonFileCache::load("/definitely/not/a/real/dir/cache.json");
        cache.put("k", CachedDescription::new("x", 1));
        assert!(matches!(
            cache.flush(),
            Err(DocVisionError::CacheWriteFailed { .. })
        ));
    }
}
