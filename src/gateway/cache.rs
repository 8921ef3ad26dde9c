//! Result cache for the query gateway.
//!
//! Entries are keyed by a SHA-256 fingerprint of the question and data
//! source, so lookups only hit on an exact textual match. The cache keeps
//! everything unless a capacity is configured, in which case the oldest
//! inserted entry is dropped to make room.

use crate::gateway::models::QueryResult;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::debug;

/// Cache key derived from `(intent, data_source)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(intent: &str, data_source: &str) -> Self {
        let mut hasher = Sha256::new();
        // Length prefix keeps ("a_b", "c") and ("a", "b_c") apart
        hasher.update((intent.len() as u64).to_le_bytes());
        hasher.update(intent.as_bytes());
        hasher.update(b"_");
        hasher.update(data_source.as_bytes());
        Fingerprint(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total: u64,
    pub hit_rate: f64,
    pub cached_entries: usize,
}

impl CacheStats {
    pub fn new(hits: u64, misses: u64, cached_entries: usize) -> Self {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        Self {
            hits,
            misses,
            total,
            hit_rate,
            cached_entries,
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<Fingerprint, QueryResult>,
    insertion_order: VecDeque<Fingerprint>,
    hits: u64,
    misses: u64,
}

pub struct QueryCache {
    state: Mutex<CacheState>,
    max_entries: Option<usize>,
}

impl QueryCache {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_entries,
        }
    }

    /// Returns the stored result and counts a hit, or counts a miss.
    pub async fn lookup(&self, key: &Fingerprint) -> Option<QueryResult> {
        let mut state = self.state.lock().await;
        match state.entries.get(key).cloned() {
            Some(result) => {
                state.hits += 1;
                Some(result)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Counts a run that went to the engine without consulting the cache.
    pub async fn record_miss(&self) {
        self.state.lock().await.misses += 1;
    }

    pub async fn store(&self, key: Fingerprint, result: QueryResult) {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.entries.get_mut(&key) {
            *existing = result;
            return;
        }

        if let Some(max) = self.max_entries {
            while state.entries.len() >= max {
                let Some(oldest) = state.insertion_order.pop_front() else {
                    break;
                };
                state.entries.remove(&oldest);
                debug!("Evicted cached query {}", oldest.as_str());
            }
        }

        state.insertion_order.push_back(key.clone());
        state.entries.insert(key, result);
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats::new(state.hits, state.misses, state.entries.len())
    }

    /// Empties the cache and resets the counters.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        *state = CacheState::default();
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}
