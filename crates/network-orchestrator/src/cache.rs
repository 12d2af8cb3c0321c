use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use network_core::{NetworkAnalysis, NetworkError, NetworkMode};

pub(crate) type SlotResult = Result<Arc<NetworkAnalysis>, NetworkError>;

/// Per-key single-flight latch. The leader computes while holding the
/// inner mutex; racers awaiting the lock read the stored result. A
/// cancelled leader releases the lock with the slot still empty, so the
/// first waiter to acquire it takes over as the new leader.
pub(crate) type Slot = Arc<tokio::sync::Mutex<Option<SlotResult>>>;

/// Cache key: analysis mode, content hash of the input snapshot, and a
/// fingerprint of the configuration used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub mode: NetworkMode,
    pub snapshot: String,
    pub config: String,
}

struct CacheEntry {
    data: Arc<NetworkAnalysis>,
    cached_at: DateTime<Utc>,
}

/// Shared result cache. Injectable collaborator: created once per
/// process and handed to the orchestrator; cleared explicitly or by the
/// per-read TTL check.
#[derive(Default)]
pub struct NetworkCache {
    entries: DashMap<CacheKey, CacheEntry>,
    in_flight: DashMap<CacheKey, Slot>,
}

impl NetworkCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
    ) -> Option<Arc<NetworkAnalysis>> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => match ttl {
                Some(ttl) if Utc::now() - entry.cached_at > ttl => true,
                _ => return Some(entry.data.clone()),
            },
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub(crate) fn store(&self, key: CacheKey, data: Arc<NetworkAnalysis>) {
        self.entries.insert(
            key,
            CacheEntry {
                data,
                cached_at: Utc::now(),
            },
        );
    }

    pub(crate) fn begin(&self, key: &CacheKey) -> Slot {
        self.in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None)))
            .value()
            .clone()
    }

    pub(crate) fn finish(&self, key: &CacheKey) {
        self.in_flight.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
