//! Ties the tiers, importance evaluator, and optional vector index together.

use cortex_core::id::{AgentId, SessionId};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

use crate::entry::{MemoryEntry, MemoryTier};
use crate::error::MemoryError;
use crate::importance::{ImportanceContext, ImportanceEvaluator, RuleBasedEvaluator};
use crate::tier::{TierConfig, TierStore};
use crate::vector::{Embedder, VectorDocument, VectorStore};

/// Thresholds and per-tier capacity/TTL, shared across one agent's
/// memory manager.
#[derive(Debug, Clone, Copy)]
pub struct MemoryManagerConfig {
    /// Importance at or above which `remember` routes straight to mid.
    pub mid_threshold: f32,
    /// Importance at or above which `remember` routes straight to long.
    pub long_threshold: f32,
    /// How often [`crate::spawn_consolidation_loop`] runs a pass.
    pub consolidation_interval: Duration,
    /// Short tier capacity/TTL.
    pub short: TierConfig,
    /// Mid tier capacity/TTL.
    pub mid: TierConfig,
    /// Long tier capacity/TTL.
    pub long: TierConfig,
}

impl Default for MemoryManagerConfig {
    fn default() -> Self {
        MemoryManagerConfig {
            mid_threshold: 0.5,
            long_threshold: 0.7,
            consolidation_interval: Duration::from_secs(5 * 60),
            short: TierConfig::short(),
            mid: TierConfig::mid(),
            long: TierConfig::long(),
        }
    }
}

/// Options accepted by [`MemoryManager::remember`].
#[derive(Debug, Clone, Default)]
pub struct RememberOptions {
    /// Conversation thread this memory was recorded under.
    pub thread_id: Option<SessionId>,
    /// Caller-supplied importance. Skips the evaluator when present.
    pub importance: Option<f32>,
    /// Caller-forced tier. Wins over importance-based routing.
    pub tier: Option<MemoryTier>,
    /// Opaque metadata carried alongside the entry.
    pub metadata: Option<Value>,
}

/// Options accepted by [`MemoryManager::recall`].
#[derive(Debug, Clone)]
pub struct RecallOptions {
    /// Restrict to entries recorded under this thread.
    pub thread_id: Option<SessionId>,
    /// Always include the most-recent short-tier entries.
    pub include_recent: bool,
    /// Maximum entries returned.
    pub limit: usize,
    /// Drop results below this importance.
    pub min_score: Option<f32>,
    /// How many most-recent short-tier entries to consider.
    pub short_k: usize,
    /// How many recent mid-tier entries to consider.
    pub mid_k: usize,
}

impl Default for RecallOptions {
    fn default() -> Self {
        RecallOptions {
            thread_id: None,
            include_recent: true,
            limit: 10,
            min_score: None,
            short_k: 5,
            mid_k: 5,
        }
    }
}

/// A formatted context bundle, grouped by where each entry came from.
#[derive(Debug, Clone, Default)]
pub struct ContextBundle {
    /// Most-recent short-tier entries.
    pub recent: Vec<MemoryEntry>,
    /// Mid-tier entries.
    pub earlier: Vec<MemoryEntry>,
    /// Long-tier entries relevant to the most recent short-tier entry.
    pub relevant: Vec<MemoryEntry>,
}

impl ContextBundle {
    /// Render as a plain-text context block, grouped under headings.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if !self.recent.is_empty() {
            out.push_str("Recent:\n");
            for e in &self.recent {
                out.push_str(&format!("- {}\n", e.content_as_text()));
            }
        }
        if !self.earlier.is_empty() {
            out.push_str("Earlier:\n");
            for e in &self.earlier {
                out.push_str(&format!("- {}\n", e.content_as_text()));
            }
        }
        if !self.relevant.is_empty() {
            out.push_str("Relevant Knowledge:\n");
            for e in &self.relevant {
                out.push_str(&format!("- {}\n", e.content_as_text()));
            }
        }
        out
    }
}

/// Counts from one [`MemoryManager::consolidate`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationResult {
    /// Entries moved short -> long.
    pub short_to_long: usize,
    /// Entries moved short -> mid.
    pub short_to_mid: usize,
    /// Short-tier entries expired.
    pub short_expired: usize,
    /// Entries moved mid -> long.
    pub mid_to_long: usize,
    /// Mid-tier entries expired.
    pub mid_expired: usize,
}

/// Per-agent tiered memory manager.
///
/// Scoped to a single `agent_id` by construction, matching the rest of
/// this system's convention that shared resources (rate limiters, state
/// stores) are agent-scoped by default; sharing a manager across agents
/// is the caller's responsibility.
pub struct MemoryManager {
    agent_id: AgentId,
    config: MemoryManagerConfig,
    short: TierStore,
    mid: TierStore,
    long: TierStore,
    evaluator: Box<dyn ImportanceEvaluator>,
    embedder: Option<Box<dyn Embedder>>,
    vector_store: Option<Box<dyn VectorStore>>,
}

impl MemoryManager {
    /// Build a manager with the rule-based evaluator and no vector backing.
    pub fn new(agent_id: AgentId, config: MemoryManagerConfig) -> Self {
        MemoryManager {
            agent_id,
            short: TierStore::new(MemoryTier::Short, config.short),
            mid: TierStore::new(MemoryTier::Mid, config.mid),
            long: TierStore::new(MemoryTier::Long, config.long),
            config,
            evaluator: Box::new(RuleBasedEvaluator),
            embedder: None,
            vector_store: None,
        }
    }

    /// Replace the importance evaluator (e.g. with a [`crate::HybridEvaluator`]).
    pub fn with_evaluator(mut self, evaluator: Box<dyn ImportanceEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Attach an embedder and vector store for semantic long-tier recall.
    pub fn with_vector_backing(
        mut self,
        embedder: Box<dyn Embedder>,
        vector_store: Box<dyn VectorStore>,
    ) -> Self {
        self.embedder = Some(embedder);
        self.vector_store = Some(vector_store);
        self
    }

    fn tier_store(&self, tier: MemoryTier) -> &TierStore {
        match tier {
            MemoryTier::Short => &self.short,
            MemoryTier::Mid => &self.mid,
            MemoryTier::Long => &self.long,
        }
    }

    fn route_tier(&self, importance: f32, forced: Option<MemoryTier>) -> MemoryTier {
        if let Some(tier) = forced {
            return tier;
        }
        if importance >= self.config.long_threshold {
            MemoryTier::Long
        } else if importance >= self.config.mid_threshold {
            MemoryTier::Mid
        } else {
            MemoryTier::Short
        }
    }

    fn ttl_for(&self, tier: MemoryTier) -> Option<Duration> {
        match tier {
            MemoryTier::Short => self.config.short.ttl,
            MemoryTier::Mid => self.config.mid.ttl,
            MemoryTier::Long => self.config.long.ttl,
        }
    }

    /// Compute importance (unless supplied), embed if a backing is
    /// configured, route to a tier, and store.
    #[tracing::instrument(skip(self, content, opts), fields(agent = %self.agent_id))]
    pub async fn remember(
        &self,
        content: Value,
        opts: RememberOptions,
    ) -> Result<MemoryEntry, MemoryError> {
        let text = match &content {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        let importance = match opts.importance {
            Some(v) => v.clamp(0.0, 1.0),
            None => {
                self.evaluator
                    .evaluate(&text, &ImportanceContext::default())
                    .await?
            }
        };

        let tier = self.route_tier(importance, opts.tier);
        let ttl = self.ttl_for(tier);

        let mut entry = MemoryEntry::new(
            self.agent_id.clone(),
            opts.thread_id,
            tier,
            content,
            importance,
            opts.metadata,
            ttl,
        );

        if let Some(embedder) = &self.embedder {
            match embedder.embed(&[text.clone()]).await {
                Ok(mut vecs) => entry.embedding = vecs.pop(),
                Err(err) => tracing::warn!(error = %err, "embedding failed, storing without a vector"),
            }
        }

        if tier == MemoryTier::Long {
            self.index_if_possible(&entry, &text).await;
        }

        self.tier_store(tier).insert(entry.clone()).await;
        Ok(entry)
    }

    async fn index_if_possible(&self, entry: &MemoryEntry, text: &str) {
        let (Some(vector_store), Some(embedding)) = (&self.vector_store, &entry.embedding) else {
            return;
        };
        let doc = VectorDocument {
            id: entry.id.clone(),
            content: text.to_string(),
            embedding: embedding.clone(),
            metadata: entry.metadata.clone(),
        };
        if let Err(err) = vector_store.add_documents(vec![doc]).await {
            tracing::warn!(error = %err, "vector store indexing failed");
        }
    }

    fn matches_thread(entry: &MemoryEntry, thread_id: &Option<SessionId>) -> bool {
        match thread_id {
            Some(id) => entry.thread_id.as_ref() == Some(id),
            None => true,
        }
    }

    /// Union of most-recent short entries, recent mid entries, and
    /// semantic (or text-contains) long matches, deduplicated by id,
    /// ordered short-first then by importance descending, truncated to
    /// `opts.limit`.
    #[tracing::instrument(skip(self, query, opts), fields(agent = %self.agent_id))]
    pub async fn recall(
        &self,
        query: &str,
        opts: RecallOptions,
    ) -> Result<Vec<MemoryEntry>, MemoryError> {
        let mut seen = HashSet::new();
        let mut short_results = Vec::new();
        let mut rest_results = Vec::new();

        if opts.include_recent {
            let mut short_snapshot: Vec<MemoryEntry> = self
                .short
                .snapshot()
                .await
                .into_iter()
                .filter(|e| Self::matches_thread(e, &opts.thread_id))
                .collect();
            short_snapshot.sort_by(|a, b| b.last_accessed_at.cmp(&a.last_accessed_at));
            short_snapshot.truncate(opts.short_k);
            for e in short_snapshot {
                if seen.insert(e.id.clone()) {
                    short_results.push(e);
                }
            }
        }

        let mut mid_snapshot: Vec<MemoryEntry> = self
            .mid
            .snapshot()
            .await
            .into_iter()
            .filter(|e| Self::matches_thread(e, &opts.thread_id))
            .collect();
        mid_snapshot.sort_by(|a, b| b.last_accessed_at.cmp(&a.last_accessed_at));
        mid_snapshot.truncate(opts.mid_k);
        for e in mid_snapshot {
            if seen.insert(e.id.clone()) {
                rest_results.push(e);
            }
        }

        let long_matches = self.search_long(query).await?;
        for e in long_matches {
            if Self::matches_thread(&e, &opts.thread_id) && seen.insert(e.id.clone()) {
                rest_results.push(e);
            }
        }

        rest_results.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        let mut results: Vec<MemoryEntry> = short_results.into_iter().chain(rest_results).collect();
        if let Some(min_score) = opts.min_score {
            results.retain(|e| e.importance >= min_score);
        }
        results.truncate(opts.limit);

        for entry in &results {
            self.tier_store(entry.tier).record_access(&entry.id).await;
        }

        Ok(results)
    }

    async fn search_long(&self, query: &str) -> Result<Vec<MemoryEntry>, MemoryError> {
        let long_snapshot = self.long.snapshot().await;

        if let (Some(embedder), Some(vector_store)) = (&self.embedder, &self.vector_store) {
            let query_vec = embedder.embed(&[query.to_string()]).await?;
            if let Some(vector) = query_vec.into_iter().next() {
                let hits = vector_store.search_by_vector(&vector, 10, None).await?;
                let by_id: std::collections::HashMap<_, _> =
                    long_snapshot.iter().map(|e| (e.id.clone(), e.clone())).collect();
                return Ok(hits
                    .into_iter()
                    .filter_map(|hit| by_id.get(&hit.document.id).cloned())
                    .collect());
            }
        }

        let needle = query.to_lowercase();
        Ok(long_snapshot
            .into_iter()
            .filter(|e| e.content_as_text().to_lowercase().contains(&needle))
            .collect())
    }

    /// Build a textual/structured context bundle for a thread: recent
    /// short entries, earlier mid entries, and long entries relevant to
    /// the most recent short entry.
    pub async fn get_context(&self, thread_id: &SessionId) -> Result<ContextBundle, MemoryError> {
        let opts = RecallOptions {
            thread_id: Some(thread_id.clone()),
            ..Default::default()
        };

        let recent: Vec<MemoryEntry> = self
            .short
            .snapshot()
            .await
            .into_iter()
            .filter(|e| Self::matches_thread(e, &opts.thread_id))
            .collect();

        let earlier: Vec<MemoryEntry> = self
            .mid
            .snapshot()
            .await
            .into_iter()
            .filter(|e| Self::matches_thread(e, &opts.thread_id))
            .collect();

        let anchor = recent
            .iter()
            .max_by(|a, b| a.created_at.cmp(&b.created_at))
            .map(|e| e.content_as_text());

        let relevant = match anchor {
            Some(text) => self.search_long(&text).await?,
            None => vec![],
        };

        Ok(ContextBundle {
            recent,
            earlier,
            relevant,
        })
    }

    /// Run one idempotent consolidation pass: promote, then expire, per
    /// the fixed five-step order. A failure indexing a promoted entry
    /// into the vector store is logged and does not block the rest of
    /// the pass.
    #[tracing::instrument(skip(self), fields(agent = %self.agent_id))]
    pub async fn consolidate(&self) -> ConsolidationResult {
        let mut result = ConsolidationResult::default();

        let short_to_long = self.short.take_at_or_above(self.config.long_threshold).await;
        result.short_to_long = short_to_long.len();
        for mut entry in short_to_long {
            entry.tier = MemoryTier::Long;
            entry.expires_at = None;
            let text = entry.content_as_text();
            self.index_if_possible(&entry, &text).await;
            self.long.insert(entry).await;
        }

        let short_to_mid = self
            .short
            .take_in_range(self.config.mid_threshold, self.config.long_threshold)
            .await;
        result.short_to_mid = short_to_mid.len();
        for mut entry in short_to_mid {
            entry.tier = MemoryTier::Mid;
            entry.expires_at = self.config.mid.ttl.map(|ttl| std::time::Instant::now() + ttl);
            self.mid.insert(entry).await;
        }

        result.short_expired = self.short.take_expired().await.len();

        let mid_to_long = self.mid.take_at_or_above(self.config.long_threshold).await;
        result.mid_to_long = mid_to_long.len();
        for mut entry in mid_to_long {
            entry.tier = MemoryTier::Long;
            entry.expires_at = None;
            let text = entry.content_as_text();
            self.index_if_possible(&entry, &text).await;
            self.long.insert(entry).await;
        }

        result.mid_expired = self.mid.take_expired().await.len();

        tracing::debug!(?result, "consolidation pass complete");
        result
    }

    /// The agent this manager is scoped to.
    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// This manager's thresholds, capacities, and TTLs.
    pub fn config(&self) -> MemoryManagerConfig {
        self.config
    }

    /// Entry counts per tier, for diagnostics.
    pub async fn stats(&self) -> (usize, usize, usize) {
        (self.short.len().await, self.mid.len().await, self.long.len().await)
    }
}
