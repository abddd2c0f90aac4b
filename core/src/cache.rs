//! Per-argument memoization of catalog results.
//!
//! RULE: only successful results are stored. A failed query is retried on
//! the next call instead of poisoning its key for the rest of the process.

use crate::{catalog::Operation, error::DashResult, table::Table};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Operation identity plus its argument tuple.
/// `list_customers` has an empty argument list and so a single key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: Operation,
    pub args: Vec<String>,
}

impl CacheKey {
    pub fn new(operation: Operation, customer_id: Option<&str>) -> Self {
        Self {
            operation,
            args: customer_id.map(str::to_string).into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub table: Arc<Table>,
    pub stored_at: DateTime<Utc>,
}

/// Decides whether a stored entry may still be served.
pub trait EvictionPolicy: Send + Sync {
    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool;
}

/// Entries live as long as the process.
pub struct NeverExpire;

impl EvictionPolicy for NeverExpire {
    fn is_fresh(&self, _entry: &CacheEntry, _now: DateTime<Utc>) -> bool {
        true
    }
}

/// Entries older than `max_age` are dropped and refetched.
pub struct MaxAge(pub Duration);

impl EvictionPolicy for MaxAge {
    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.stored_at < self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct ResultCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    policy: Box<dyn EvictionPolicy>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_policy(Box::new(NeverExpire))
    }

    pub fn with_policy(policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            policy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Serve a fresh entry, if any. Stale entries are removed.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Table>> {
        let mut entries = self.lock();
        let now = Utc::now();
        let hit = match entries.get(key) {
            Some(entry) if self.policy.is_fresh(entry, now) => Some(Arc::clone(&entry.table)),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        };
        drop(entries);

        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("cache hit {:?} {:?}", key.operation, key.args);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            log::debug!("cache miss {:?} {:?}", key.operation, key.args);
        }
        hit
    }

    pub fn insert(&self, key: CacheKey, table: Arc<Table>) {
        self.lock().insert(
            key,
            CacheEntry {
                table,
                stored_at: Utc::now(),
            },
        );
    }

    /// Cached table for `key`, or the result of `fetch`, stored only on success.
    ///
    /// The map is not locked while `fetch` runs, so two threads missing the
    /// same key may both fetch; the later insert wins.
    pub fn get_or_fetch<F>(&self, key: CacheKey, fetch: F) -> DashResult<(Arc<Table>, bool)>
    where
        F: FnOnce() -> DashResult<Table>,
    {
        if let Some(table) = self.get(&key) {
            return Ok((table, true));
        }
        let table = Arc::new(fetch()?);
        self.insert(key, Arc::clone(&table));
        Ok((table, false))
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        // The map holds no invariants a panicking writer could break.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
