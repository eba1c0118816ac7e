//! Shared Store and Stats Registry
//!
//! This module implements the cache's shared state: the key/value map,
//! the entry-count bound, and the command counters exposed by `stats`.
//!
//! ## Concurrency Model
//!
//! Every session task shares one `Store` behind an `Arc`. A single mutex
//! guards the map and the counters together, and each logical command
//! (a `get`, a `set` completion, a `delete`) does its whole
//! read-modify-write, including the `curr_items` recomputation, inside
//! one lock acquisition. Two sessions can therefore never interleave
//! partial updates: mutations are linearizable and the entry count can
//! never drift from the live map size.
//!
//! The lock is released before any socket I/O happens; nothing async
//! runs while it is held.
//!
//! ## Counting Policy
//!
//! The counters keep the original protocol's accounting, asymmetry
//! included: `get_hits` goes up once per `get` invocation while
//! `get_misses` goes up once per missing key, and `cmd_get` is always
//! recomputed as `get_hits + get_misses`.

use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Default maximum number of entries the store will hold.
pub const DEFAULT_ITEM_LIMIT: usize = 65535;

/// Errors produced by store mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Inserting a new key was refused because the store is at capacity.
    #[error("cache full: {limit} items")]
    CacheFull { limit: usize },
}

/// The fixed set of counters reported by the `stats` command.
///
/// `curr_items` is recomputed from the live map size after each mutation
/// and `limit_items` is fixed at construction; the rest only ever go up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsRegistry {
    pub cmd_get: u64,
    pub cmd_set: u64,
    pub get_hits: u64,
    pub get_misses: u64,
    pub delete_hits: u64,
    pub delete_misses: u64,
    pub curr_items: u64,
    pub limit_items: u64,
}

impl StatsRegistry {
    fn new(limit: usize) -> Self {
        Self {
            limit_items: limit as u64,
            ..Self::default()
        }
    }

    /// Returns the counters as `(name, count)` pairs for the `stats`
    /// response. The order is not part of the wire contract.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("cmd_get", self.cmd_get),
            ("cmd_set", self.cmd_set),
            ("get_hits", self.get_hits),
            ("get_misses", self.get_misses),
            ("delete_hits", self.delete_hits),
            ("delete_misses", self.delete_misses),
            ("curr_items", self.curr_items),
            ("limit_items", self.limit_items),
        ]
    }
}

/// Map plus counters, guarded together so one command's work is atomic.
#[derive(Debug)]
struct StoreInner {
    entries: HashMap<String, String>,
    stats: StatsRegistry,
}

/// The shared key/value store backing the cache.
///
/// # Thread Safety
///
/// Designed to be wrapped in an `Arc` and shared across all session
/// tasks. Each method is one critical section; see the module docs.
///
/// # Example
///
/// ```
/// use memline::storage::Store;
///
/// let store = Store::with_capacity(100);
///
/// store.insert("name", "Ariz").unwrap();
/// assert_eq!(
///     store.lookup(&["name"]),
///     vec![("name".to_string(), Some("Ariz".to_string()))]
/// );
///
/// assert!(store.remove("name"));
/// assert!(store.is_empty());
/// ```
#[derive(Debug)]
pub struct Store {
    inner: Mutex<StoreInner>,
    capacity: usize,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates a store with the default item limit.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ITEM_LIMIT)
    }

    /// Creates a store bounded to `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                entries: HashMap::new(),
                stats: StatsRegistry::new(capacity),
            }),
            capacity,
        }
    }

    /// Returns the configured maximum entry count.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the current number of live entries.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a batch of keys for one `get` invocation.
    ///
    /// Returns one `(key, value)` pair per requested key, in request
    /// order, with `None` for misses. Accounting happens in the same
    /// critical section: `get_misses` per missing key, `get_hits` once
    /// for the invocation, `cmd_get` recomputed from both.
    pub fn lookup(&self, keys: &[&str]) -> Vec<(String, Option<String>)> {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        let mut results = Vec::with_capacity(keys.len());
        for &key in keys {
            let value = inner.entries.get(key).cloned();
            if value.is_none() {
                inner.stats.get_misses += 1;
            }
            results.push((key.to_string(), value));
        }

        inner.stats.get_hits += 1;
        inner.stats.cmd_get = inner.stats.get_hits + inner.stats.get_misses;

        results
    }

    /// Records the first phase of a `set` exchange.
    ///
    /// The `set <key>` line touches nothing but the `cmd_set` counter;
    /// storage happens when the value line arrives.
    pub fn note_set(&self) {
        self.inner.lock().unwrap().stats.cmd_set += 1;
    }

    /// Stores `value` under `key`, completing a `set` exchange.
    ///
    /// Overwrites are always allowed. Inserting a new key while the
    /// store is at capacity fails with [`StoreError::CacheFull`] and
    /// leaves both the map and the counters untouched.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if a new entry was created, `Ok(false)` on overwrite.
    pub fn insert(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        let is_new = !inner.entries.contains_key(key);
        if is_new && inner.entries.len() >= self.capacity {
            return Err(StoreError::CacheFull {
                limit: self.capacity,
            });
        }

        inner.entries.insert(key.to_string(), value.to_string());
        inner.stats.curr_items = inner.entries.len() as u64;

        Ok(is_new)
    }

    /// Removes `key` from the store.
    ///
    /// Returns `true` and bumps `delete_hits` if the key existed,
    /// otherwise bumps `delete_misses`. `curr_items` is recomputed in
    /// the same critical section.
    pub fn remove(&self, key: &str) -> bool {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        if inner.entries.remove(key).is_none() {
            inner.stats.delete_misses += 1;
            return false;
        }

        inner.stats.delete_hits += 1;
        inner.stats.curr_items = inner.entries.len() as u64;
        true
    }

    /// Returns the counters for one `stats` invocation.
    pub fn stats_snapshot(&self) -> Vec<(&'static str, u64)> {
        self.inner.lock().unwrap().stats.snapshot()
    }

    /// Returns a copy of the stats registry.
    pub fn stats(&self) -> StatsRegistry {
        self.inner.lock().unwrap().stats.clone()
    }
}
