//! Optional semantic search backing for the long tier.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::MemoryError;

/// Produces fixed-size embedding vectors from text, preserving input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed each text, one vector per input in the same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError>;
}

/// A document plus its embedding and opaque metadata, as stored by a
/// [`VectorStore`].
#[derive(Debug, Clone)]
pub struct VectorDocument {
    /// Id linking this document back to its owning [`crate::MemoryEntry`].
    pub id: String,
    /// The embedded text.
    pub content: String,
    /// The embedding vector.
    pub embedding: Vec<f32>,
    /// Caller-supplied metadata, opaque to the store.
    pub metadata: Option<Value>,
}

/// A scored hit returned from [`VectorStore::search_by_vector`].
#[derive(Debug, Clone)]
pub struct VectorHit {
    /// The matched document.
    pub document: VectorDocument,
    /// Similarity score, higher is more similar.
    pub score: f32,
}

/// k-NN vector index. `MemoryManager` uses this for long-tier semantic
/// recall when both an `Embedder` and a `VectorStore` are configured;
/// without one, `recall` falls back to a text-contains scan.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Index a batch of documents, replacing any existing entry with the
    /// same id.
    async fn add_documents(&self, docs: Vec<VectorDocument>) -> Result<(), MemoryError>;

    /// Return up to `limit` nearest neighbors of `vector`, filtered to
    /// scores at or above `min_score` when given.
    async fn search_by_vector(
        &self,
        vector: &[f32],
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<VectorHit>, MemoryError>;

    /// Remove documents by id. Absent ids are ignored.
    async fn delete_documents(&self, ids: &[String]) -> Result<(), MemoryError>;
}

/// Cosine similarity, `0.0` if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
