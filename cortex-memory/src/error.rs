//! Error type for the memory manager.

use thiserror::Error;

/// Errors raised by [`crate::MemoryManager`] and its tiers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MemoryError {
    /// A tier's backing store could not service a request.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Embedding computation failed. Consolidation and `recall` degrade to
    /// their non-vector fallback rather than propagating this.
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    /// The requested entry does not exist in any tier.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
