//! In-process backing store for one memory tier, with capacity-based eviction.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::entry::{MemoryEntry, MemoryTier};

/// Capacity and lifetime for one tier.
#[derive(Debug, Clone, Copy)]
pub struct TierConfig {
    /// Maximum number of entries this tier holds before eviction kicks in.
    pub capacity: usize,
    /// Absolute lifetime past which an entry expires. `None` for the long
    /// tier, which never expires on its own.
    pub ttl: Option<Duration>,
}

impl TierConfig {
    /// `maxShort` (10), `ttlShort` (1h).
    pub fn short() -> Self {
        TierConfig {
            capacity: 10,
            ttl: Some(Duration::from_secs(3600)),
        }
    }

    /// `maxMid` (100), `ttlMid` (24h).
    pub fn mid() -> Self {
        TierConfig {
            capacity: 100,
            ttl: Some(Duration::from_secs(24 * 3600)),
        }
    }

    /// `maxLong` (1000), no TTL.
    pub fn long() -> Self {
        TierConfig {
            capacity: 1000,
            ttl: None,
        }
    }
}

/// One tier's storage: a map behind a `RwLock`, with tier-appropriate
/// eviction ordering applied whenever an insert pushes it over capacity.
pub struct TierStore {
    tier: MemoryTier,
    config: TierConfig,
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl TierStore {
    /// Create an empty store for the given tier and configuration.
    pub fn new(tier: MemoryTier, config: TierConfig) -> Self {
        TierStore {
            tier,
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// This tier's configuration.
    pub fn config(&self) -> TierConfig {
        self.config
    }

    /// Insert an entry, then evict the lowest-scoring entries if this push
    /// exceeded capacity. Eviction reads a snapshot, picks victim ids, and
    /// deletes by id set — a concurrent insert racing this one loses at
    /// most one slot rather than corrupting the map.
    pub async fn insert(&self, entry: MemoryEntry) {
        let id = entry.id.clone();
        {
            let mut guard = self.entries.write().await;
            guard.insert(id, entry);
        }
        self.evict_over_capacity().await;
    }

    async fn evict_over_capacity(&self) {
        let victims: Vec<String> = {
            let guard = self.entries.read().await;
            if guard.len() <= self.config.capacity {
                return;
            }
            let overflow = guard.len() - self.config.capacity;
            let mut scored: Vec<(&String, f32)> = guard
                .iter()
                .map(|(id, e)| (id, self.eviction_score(e)))
                .collect();
            scored.sort_by(|a, b| a.1.total_cmp(&b.1));
            scored
                .into_iter()
                .take(overflow)
                .map(|(id, _)| id.clone())
                .collect()
        };
        if victims.is_empty() {
            return;
        }
        let mut guard = self.entries.write().await;
        for id in &victims {
            guard.remove(id);
        }
    }

    /// Lower is evicted first. Short tier: `0.7*importance + 0.3*recency`.
    /// Mid/long: `(importance, access_count, created_at)` ascending,
    /// folded into one float by weighting importance heaviest, then
    /// access count, then age (older = evicted first among ties).
    fn eviction_score(&self, entry: &MemoryEntry) -> f32 {
        match self.tier {
            MemoryTier::Short => {
                let ttl = self.config.ttl.unwrap_or(Duration::from_secs(3600));
                entry.short_term_score(ttl)
            }
            MemoryTier::Mid | MemoryTier::Long => {
                let age_penalty = -(entry.age().as_secs_f32() / 1_000_000.0);
                entry.importance * 1000.0 + entry.access_count as f32 + age_penalty
            }
        }
    }

    /// Remove and return entries past their TTL. A no-op for the long
    /// tier, whose entries carry no `expires_at`.
    pub async fn take_expired(&self) -> Vec<MemoryEntry> {
        let expired_ids: Vec<String> = {
            let guard = self.entries.read().await;
            guard
                .values()
                .filter(|e| e.is_expired())
                .map(|e| e.id.clone())
                .collect()
        };
        if expired_ids.is_empty() {
            return vec![];
        }
        let mut guard = self.entries.write().await;
        expired_ids
            .into_iter()
            .filter_map(|id| guard.remove(&id))
            .collect()
    }

    /// Remove and return entries at or above `threshold` importance, for
    /// consolidation's promotion pass.
    pub async fn take_at_or_above(&self, threshold: f32) -> Vec<MemoryEntry> {
        let ids: Vec<String> = {
            let guard = self.entries.read().await;
            guard
                .values()
                .filter(|e| e.importance >= threshold)
                .map(|e| e.id.clone())
                .collect()
        };
        if ids.is_empty() {
            return vec![];
        }
        let mut guard = self.entries.write().await;
        ids.into_iter().filter_map(|id| guard.remove(&id)).collect()
    }

    /// Remove and return entries in `[lower, upper)` importance, for
    /// consolidation's mid-band move.
    pub async fn take_in_range(&self, lower: f32, upper: f32) -> Vec<MemoryEntry> {
        let ids: Vec<String> = {
            let guard = self.entries.read().await;
            guard
                .values()
                .filter(|e| e.importance >= lower && e.importance < upper)
                .map(|e| e.id.clone())
                .collect()
        };
        if ids.is_empty() {
            return vec![];
        }
        let mut guard = self.entries.write().await;
        ids.into_iter().filter_map(|id| guard.remove(&id)).collect()
    }

    /// Remove a single entry by id, if present.
    pub async fn remove(&self, id: &str) -> Option<MemoryEntry> {
        self.entries.write().await.remove(id)
    }

    /// Mark an entry as accessed, bumping its recency/access-count fields.
    pub async fn record_access(&self, id: &str) {
        if let Some(entry) = self.entries.write().await.get_mut(id) {
            entry.record_access();
        }
    }

    /// Snapshot all entries currently in this tier, cloned out from under
    /// the lock.
    pub async fn snapshot(&self) -> Vec<MemoryEntry> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether this tier currently holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
