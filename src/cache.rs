// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Bounded LRU cache for rendered time reports.
//!
//! Entries are keyed by the normalized server name (see
//! [`ServerName::key`](crate::validate::ServerName::key)), so differently
//! cased or dotted spellings of one server share a single entry and cannot
//! bypass freshness rules. Expiry is lazy: an entry past its TTL is removed
//! on the lookup that finds it, never by a background sweep.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Configuration for the response cache.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of live entries.
    pub max_entries: usize,
    /// Freshness lifetime of an entry.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            // ~200 bytes per rendered report keeps 100 entries around 20KB.
            max_entries: 100,
            ttl: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    report: String,
    created: Instant,
    last_used: u64,
}

/// Bounded least-recently-used store of rendered reports.
///
/// Both inserts and hits refresh an entry's recency; eviction removes the
/// single least-recently-used entry when an insert would exceed capacity.
#[derive(Debug)]
pub struct ResponseCache {
    config: CacheConfig,
    entries: HashMap<String, CacheEntry>,
    /// Monotonic use counter; higher = more recently used.
    tick: u64,
}

impl ResponseCache {
    /// Create an empty cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        ResponseCache {
            config,
            entries: HashMap::new(),
            tick: 0,
        }
    }

    /// Look up a fresh entry, refreshing its recency.
    ///
    /// An entry whose age has reached the TTL is evicted and reported as
    /// absent.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<&str> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => now.duration_since(entry.created) >= self.config.ttl,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }

        self.tick += 1;
        let entry = self.entries.get_mut(key)?;
        entry.last_used = self.tick;
        Some(&entry.report)
    }

    /// Insert or overwrite an entry, stamping it with `now`.
    ///
    /// If the cache is at capacity and the key is new, the least-recently-used
    /// entry is evicted first.
    pub fn insert(&mut self, key: &str, report: String, now: Instant) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.config.max_entries {
            if let Some(lru_key) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&lru_key);
            }
        }

        self.tick += 1;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                report,
                created: now,
                last_used: self.tick,
            },
        );
    }

    /// Number of live entries (stale entries count until a lookup evicts them).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        ResponseCache::new(CacheConfig::default())
    }
}
