//! CTag-keyed collection cache.
//!
//! One cache instance per service; entries live for the process lifetime
//! only. A collection without a CTag is never cached ([`CollectionCache::is_fresh`]
//! reports stale for an empty tag), which keeps such collections correct at
//! the cost of a fetch per read.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// One cached collection: the CTag it was fetched under, the raw objects, and
/// when the fetch happened.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub ctag: String,
    pub objects: Vec<T>,
    pub fetched_at: Instant,
}

/// Map from collection URL to its cached objects, guarded for concurrent use.
#[derive(Debug)]
pub struct CollectionCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> Default for CollectionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> CollectionCache<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, url: &str) -> Option<CacheEntry<T>> {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .get(url)
            .cloned()
    }

    pub fn set(&self, url: &str, ctag: &str, objects: Vec<T>) {
        let entry = CacheEntry {
            ctag: ctag.to_string(),
            objects,
            fetched_at: Instant::now(),
        };
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert(url.to_string(), entry);
    }

    /// A stored entry is fresh iff it exists, `current_ctag` is non-empty, and
    /// the tags match exactly.
    pub fn is_fresh(&self, url: &str, current_ctag: &str) -> bool {
        if current_ctag.is_empty() {
            return false;
        }
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .get(url)
            .is_some_and(|entry| entry.ctag == current_ctag)
    }

    pub fn invalidate(&self, url: &str) {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .remove(url);
    }

    pub fn clear(&self) {
        self.entries.lock().expect("cache mutex poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
