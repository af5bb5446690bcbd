//! Backing stores for the response cache.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// One remembered successful response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub signature: String,
    pub payload: Value,
    pub fetched_at_ms: i64,
    pub ttl_secs: u64,
    /// Sequence number of the fetch that produced this entry
    #[serde(default)]
    pub sequence: u64,
}

impl CacheEntry {
    /// Fresh while `now - fetched_at < ttl`; a TTL of 0 is never fresh.
    pub fn is_fresh_at(&self, now_ms: i64) -> bool {
        let ttl_ms = i64::try_from(self.ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.fetched_at_ms) < ttl_ms
    }

    /// Whole seconds since the entry was written.
    pub fn age_secs_at(&self, now_ms: i64) -> u64 {
        u64::try_from(now_ms.saturating_sub(self.fetched_at_ms) / 1000).unwrap_or(0)
    }
}

/// Keyed storage for cache entries.
///
/// Implementations may fail (disk full, quota exceeded); callers decide
/// whether a failure matters.
pub trait CacheStore: Send + Sync {
    fn load(&self, signature: &str) -> AppResult<Option<CacheEntry>>;
    fn save(&self, entry: &CacheEntry) -> AppResult<()>;
    fn remove(&self, signature: &str) -> AppResult<()>;
}

/// In-process store, optionally bounded by an entry quota.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
    max_entries: Option<usize>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes of new signatures once `max_entries` are stored.
    pub fn with_quota(max_entries: usize) -> Self {
        Self { entries: DashMap::new(), max_entries: Some(max_entries) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, signature: &str) -> AppResult<Option<CacheEntry>> {
        Ok(self.entries.get(signature).map(|e| e.clone()))
    }

    fn save(&self, entry: &CacheEntry) -> AppResult<()> {
        if let Some(max) = self.max_entries {
            if self.entries.len() >= max && !self.entries.contains_key(&entry.signature) {
                return Err(AppError::Cache(format!("quota exceeded ({} entries)", max)));
            }
        }
        self.entries.insert(entry.signature.clone(), entry.clone());
        Ok(())
    }

    fn remove(&self, signature: &str) -> AppResult<()> {
        self.entries.remove(signature);
        Ok(())
    }
}

/// One pretty-printed JSON file per signature inside `dir`.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// `<data_dir>/finboard/cache`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("finboard").join("cache"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, signature: &str) -> PathBuf {
        // Signatures are `sig_<hex>`; anything else is flattened to stay inside `dir`.
        let file: String = signature
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

impl CacheStore for FileCacheStore {
    fn load(&self, signature: &str) -> AppResult<Option<CacheEntry>> {
        let path = self.entry_path(signature);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, entry: &CacheEntry) -> AppResult<()> {
        let path = self.entry_path(&entry.signature);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entry)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, signature: &str) -> AppResult<()> {
        match std::fs::remove_file(self.entry_path(signature)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
