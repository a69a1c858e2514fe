#![deny(missing_docs)]
//! Tiered short/mid/long-term memory for agents.
//!
//! Three tiers per agent, moving fastest-to-slowest: [`MemoryTier::Short`]
//! (small, recency-evicted, short TTL), [`MemoryTier::Mid`] (bigger,
//! importance-evicted, day-scale TTL), [`MemoryTier::Long`] (unbounded
//! lifetime, optionally semantically searchable). [`MemoryManager::remember`]
//! scores and routes content into a tier; [`MemoryManager::recall`] reads
//! across all three; [`MemoryManager::consolidate`] periodically promotes
//! and expires entries between them.
//!
//! This crate has no dependency on `cortex-state-memory` or
//! `cortex_core::state::StateStore` — memory entries are a distinct
//! concept from the key/value state an `Operator` reads its conversation
//! history from, scored and tiered rather than addressed by key.

mod entry;
mod error;
mod importance;
mod manager;
mod scheduler;
mod tier;
mod vector;

pub use entry::{MemoryEntry, MemoryTier};
pub use error::MemoryError;
pub use importance::{HybridEvaluator, ImportanceContext, ImportanceEvaluator, RuleBasedEvaluator};
pub use manager::{
    ConsolidationResult, ContextBundle, MemoryManager, MemoryManagerConfig, RecallOptions,
    RememberOptions,
};
pub use scheduler::spawn_consolidation_loop;
pub use tier::TierConfig;
pub use vector::{cosine_similarity, Embedder, VectorDocument, VectorHit, VectorStore};
