//! The unit of storage moved between tiers.

use cortex_core::id::{AgentId, SessionId};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a process-local, monotonically increasing entry id.
fn next_id() -> String {
    format!("mem-{}", NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Which tier an entry currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryTier {
    /// Recency-ordered, small, short-lived.
    Short,
    /// Indexed by agent/thread/importance, medium lifetime.
    Mid,
    /// Never expires, optionally semantically searchable.
    Long,
}

/// A single remembered fact, owned by exactly one tier at a time.
///
/// Promotion between tiers moves an entry (the original is deleted), it is
/// never copied, so `access_count` and `last_accessed_at` carry forward
/// across a promotion rather than resetting.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    /// Process-local identifier, stable across promotions.
    pub id: String,
    /// The agent this memory belongs to.
    pub agent_id: AgentId,
    /// Optional conversation thread this memory was recorded under.
    pub thread_id: Option<SessionId>,
    /// Which tier currently owns this entry.
    pub tier: MemoryTier,
    /// The remembered content.
    pub content: Value,
    /// Importance in `[0, 1]`, clamped on construction.
    pub importance: f32,
    /// Embedding vector, present only when an embedding function was supplied.
    pub embedding: Option<Vec<f32>>,
    /// When this entry was first created.
    pub created_at: Instant,
    /// When this entry was last read via `recall`.
    pub last_accessed_at: Instant,
    /// Number of times this entry has been returned by `recall`.
    pub access_count: u32,
    /// Caller-supplied metadata, opaque to the manager.
    pub metadata: Option<Value>,
    /// Short/mid-only: absolute expiry. `None` for long-tier entries.
    pub expires_at: Option<Instant>,
}

impl MemoryEntry {
    /// Build a new entry in the given tier, stamping `created_at` and
    /// `last_accessed_at` to now and `access_count` to zero.
    pub fn new(
        agent_id: AgentId,
        thread_id: Option<SessionId>,
        tier: MemoryTier,
        content: Value,
        importance: f32,
        metadata: Option<Value>,
        ttl: Option<Duration>,
    ) -> Self {
        let now = Instant::now();
        MemoryEntry {
            id: next_id(),
            agent_id,
            thread_id,
            tier,
            content,
            importance: importance.clamp(0.0, 1.0),
            embedding: None,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            metadata,
            expires_at: ttl.map(|d| now + d),
        }
    }

    /// Age since creation.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Whether this entry has passed its TTL. Always `false` for long-tier
    /// entries, which carry no `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Record a read: bump `access_count` and refresh `last_accessed_at`.
    pub fn record_access(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = Instant::now();
    }

    /// `0.7*importance + 0.3*recency`, recency = `1 - age/ttl`, clamped to
    /// `[0, 1]`. Used only for short-tier eviction.
    pub fn short_term_score(&self, ttl: Duration) -> f32 {
        let age = self.age().as_secs_f32();
        let ttl_secs = ttl.as_secs_f32().max(f32::EPSILON);
        let recency = (1.0 - age / ttl_secs).clamp(0.0, 1.0);
        0.7 * self.importance + 0.3 * recency
    }

    /// Best-effort text view of `content`, used by the text-contains
    /// fallback search and by the rule-based importance evaluator.
    pub fn content_as_text(&self) -> String {
        match &self.content {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
