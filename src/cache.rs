//! Resolution cache: one entry per (bundle, link text, scope), failures included.
//!
//! Reads take a shared lock; inserts are check-then-insert under the write
//! lock, so two threads that race on the same key both end up returning the
//! first stored result. In-flight markers are keyed by thread, which means a
//! key being resolved on another thread is never mistaken for a cycle.
//!
//! Fallback outcomes are stored under the fallback's bundle with no scope and
//! computed through [`ResolutionCache::get_or_resolve`], so a fallback sees each
//! link text once per build.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};

use crate::reference::{ResolutionResult, ResolvedReference};

/// Identity of one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Bundle doing the resolving.
    pub bundle_id: String,
    /// Link text as written.
    pub raw: String,
    /// Referring container for relative links; `None` for absolute links.
    pub scope: Option<ResolvedReference>,
}

/// Hit and miss counts since the cache was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: usize,
    /// Lookups that found nothing.
    pub misses: usize,
}

/// Shared memo of resolution outcomes for one build.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    /// Stored outcomes.
    entries: RwLock<HashMap<CacheKey, ResolutionResult>>,
    /// Lookups answered from `entries`.
    hits: AtomicUsize,
    /// Keys being resolved, per thread.
    in_flight: Mutex<HashSet<(ThreadId, CacheKey)>>,
    /// Lookups that missed.
    misses: AtomicUsize,
    /// Serializes `get_or_resolve` so its closure runs once per key.
    once: Mutex<()>,
}

impl ResolutionCache {
    /// An empty cache.
    pub fn new() -> Self {
        return Self::default();
    }

    /// The stored outcome for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<ResolutionResult> {
        let found = self.entries.read().get(key).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        return found;
    }

    /// Store `result` unless another thread stored one first; returns whichever is stored.
    pub fn insert(&self, key: CacheKey, result: ResolutionResult) -> ResolutionResult {
        let mut entries = self.entries.write();
        return entries.entry(key).or_insert(result).clone();
    }

    /// The stored outcome for `key`, running `resolve` only when nothing is stored.
    ///
    /// Callers are serialized, so concurrent misses on one key run `resolve`
    /// exactly once. `resolve` must not call back into this cache.
    pub fn get_or_resolve(&self, key: CacheKey, resolve: impl FnOnce() -> ResolutionResult) -> ResolutionResult {
        let _serial = self.once.lock();
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        return self.insert(key, resolve());
    }

    /// Mark `key` as being resolved on this thread.
    ///
    /// Returns `None` when this thread is already resolving `key`, which is a
    /// cycle. The marker is cleared when the guard drops.
    pub fn begin(&self, key: &CacheKey) -> Option<InFlight<'_>> {
        let marker = (thread::current().id(), key.clone());
        if !self.in_flight.lock().insert(marker.clone()) {
            return None;
        }
        return Some(InFlight { cache: self, marker });
    }

    /// Drop every entry; the next build starts cold.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Number of stored outcomes.
    pub fn len(&self) -> usize {
        return self.entries.read().len();
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        return self.entries.read().is_empty();
    }

    /// Hit and miss counts.
    pub fn stats(&self) -> CacheStats {
        return CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        };
    }
}

/// Guard for an in-flight resolution.
#[derive(Debug)]
pub struct InFlight<'a> {
    /// Cache holding the marker.
    cache: &'a ResolutionCache,
    /// The marker to remove on drop.
    marker: (ThreadId, CacheKey),
}

impl Drop for InFlight<'_> {
    /// Clear the in-flight marker.
    fn drop(&mut self) {
        self.cache.in_flight.lock().remove(&self.marker);
    }
}
