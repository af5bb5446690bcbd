//! TTL response cache keyed by request signature.
//!
//! Store failures never propagate: a broken store degrades to "no cache".
//! Writes are ordered by a per-cache monotonic sequence number so a stale
//! in-flight fetch cannot overwrite a newer committed response.

pub mod signature;
pub mod store;


use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::utils::time::now_millis;
pub use signature::{normalize_url, origin_key, RequestSignature};
pub use store::{CacheEntry, CacheStore, FileCacheStore, MemoryCacheStore};

pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    sequence: AtomicU64,
    committed: DashMap<String, u64>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .field("committed", &self.committed.len())
            .finish_non_exhaustive()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store, sequence: AtomicU64::new(0), committed: DashMap::new() }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()))
    }

    /// File-backed cache under `dir`, or [`FileCacheStore::default_dir`] when `None`.
    pub fn on_disk(dir: Option<PathBuf>) -> AppResult<Self> {
        let dir = dir
            .or_else(FileCacheStore::default_dir)
            .ok_or_else(|| AppError::Cache("no data directory available for the cache".to_string()))?;
        debug!(dir = %dir.display(), "using file-backed response cache");
        Ok(Self::new(Arc::new(FileCacheStore::new(dir)?)))
    }

    /// Take the sequence number for a fetch that is about to start.
    pub fn begin_request(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Fresh entry for `signature`, or `None`. `bypass` always misses.
    pub fn get(&self, signature: &str, bypass: bool) -> Option<CacheEntry> {
        self.get_at(signature, bypass, now_millis())
    }

    pub(crate) fn get_at(&self, signature: &str, bypass: bool, now_ms: i64) -> Option<CacheEntry> {
        if bypass {
            return None;
        }

        match self.store.load(signature) {
            Ok(Some(entry)) if entry.is_fresh_at(now_ms) => Some(entry),
            Ok(_) => None,
            Err(e) => {
                warn!(signature = %signature, "cache read failed, continuing uncached: {}", e);
                None
            }
        }
    }

    /// Write `payload` unless a newer fetch already committed for `signature`.
    ///
    /// Returns whether the entry was stored.
    pub fn put(&self, signature: &str, payload: Value, ttl_secs: u64, sequence: u64) -> bool {
        self.put_at(signature, payload, ttl_secs, sequence, now_millis())
    }

    pub(crate) fn put_at(
        &self,
        signature: &str,
        payload: Value,
        ttl_secs: u64,
        sequence: u64,
        now_ms: i64,
    ) -> bool {
        let entry = CacheEntry {
            signature: signature.to_string(),
            payload,
            fetched_at_ms: now_ms,
            ttl_secs,
            sequence,
        };

        // The shard guard is held across the store write so check-and-commit is atomic.
        match self.committed.entry(signature.to_string()) {
            Entry::Occupied(mut committed) => {
                if *committed.get() > sequence {
                    debug!(
                        signature = %signature,
                        sequence,
                        committed = *committed.get(),
                        "stale cache write rejected"
                    );
                    return false;
                }
                if !self.save(&entry) {
                    return false;
                }
                committed.insert(sequence);
            }
            Entry::Vacant(vacant) => {
                if !self.save(&entry) {
                    return false;
                }
                vacant.insert(sequence);
            }
        }
        true
    }

    fn save(&self, entry: &CacheEntry) -> bool {
        match self.store.save(entry) {
            Ok(()) => true,
            Err(e) => {
                warn!(signature = %entry.signature, "cache write failed, response not cached: {}", e);
                false
            }
        }
    }

    pub fn invalidate(&self, signature: &str) {
        if let Err(e) = self.store.remove(signature) {
            warn!(signature = %signature, "cache invalidation failed: {}", e);
        }
    }
}
