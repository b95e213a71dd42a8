//! In-memory vector index with brute-force cosine similarity search.
//!
//! Every stored vector is scored against the query, which makes this index
//! the correctness baseline: results are exact, ordered by descending
//! similarity with ties broken by ascending node id.
//!
//! The index holds no node data of its own, only embeddings keyed by node id.
//! Locking is the owner's job; see the engine crate.

use std::cmp::Ordering;
use std::collections::HashMap;

use trellis_core::error::{Result, TrellisError};
use trellis_core::types::NodeId;

/// A single hit returned from a vector search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub node_id: NodeId,
    /// Cosine similarity in [-1, 1].
    pub score: f64,
}

/// Embeddings keyed by node id, with a fixed dimensionality.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    /// Fixed by configuration or by the first embedding ever stored.
    dimensions: Option<usize>,
    entries: HashMap<NodeId, Vec<f32>>,
}

impl VectorIndex {
    /// Create an empty index whose dimensionality is set by the first insert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with a pinned dimensionality.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: Some(dimensions),
            entries: HashMap::new(),
        }
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Store `vector` as the embedding of `node_id`, replacing any prior one.
    ///
    /// # Errors
    /// `DimensionMismatch` if the length differs from the index dimensionality,
    /// `InvalidArgument` for an empty vector or non-finite components.
    pub fn set_embedding(&mut self, node_id: NodeId, vector: Vec<f32>) -> Result<()> {
        self.check_vector(&vector)?;
        self.dimensions.get_or_insert(vector.len());
        self.entries.insert(node_id, vector);
        Ok(())
    }

    /// Validate a vector against this index without storing it.
    pub fn check_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.is_empty() {
            return Err(TrellisError::InvalidArgument(
                "embedding vector must not be empty".into(),
            ));
        }
        if let Some(expected) = self.dimensions {
            if vector.len() != expected {
                return Err(TrellisError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(TrellisError::InvalidArgument(
                "embedding vector contains non-finite values".into(),
            ));
        }
        Ok(())
    }

    /// Remove the embedding of `node_id`. Returns whether one existed.
    pub fn remove_embedding(&mut self, node_id: NodeId) -> bool {
        self.entries.remove(&node_id).is_some()
    }

    pub fn get(&self, node_id: NodeId) -> Option<&[f32]> {
        self.entries.get(&node_id).map(Vec::as_slice)
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.entries.contains_key(&node_id)
    }

    /// Similarity of one stored embedding to `query`, if the node has one.
    pub fn score(&self, query: &[f32], node_id: NodeId) -> Option<f64> {
        self.entries
            .get(&node_id)
            .map(|v| cosine_similarity(query, v))
    }

    /// Check a query vector's length against the index dimensionality.
    pub fn check_query(&self, query: &[f32]) -> Result<()> {
        match self.dimensions {
            Some(expected) if query.len() != expected => Err(TrellisError::DimensionMismatch {
                expected,
                actual: query.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Top `k` nodes by cosine similarity to `query`.
    ///
    /// `filter` is applied before top-k selection, so a restrictive filter
    /// never starves the result while more matching nodes exist.
    ///
    /// # Errors
    /// `DimensionMismatch` if the query length differs from the index
    /// dimensionality.
    pub fn search<F>(&self, query: &[f32], k: usize, filter: F) -> Result<Vec<SearchHit>>
    where
        F: Fn(NodeId) -> bool,
    {
        self.check_query(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<SearchHit> = self
            .entries
            .iter()
            .filter(|(id, _)| filter(**id))
            .map(|(id, embedding)| SearchHit {
                node_id: *id,
                score: cosine_similarity(query, embedding),
            })
            .collect();

        scored.sort_by(rank_order);
        scored.truncate(k);
        Ok(scored)
    }

    /// Iterate over `(node_id, embedding)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[f32])> {
        self.entries.iter().map(|(id, v)| (*id, v.as_slice()))
    }

    /// Return the number of embeddings currently stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Descending score, then ascending node id.
fn rank_order(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.node_id.cmp(&b.node_id))
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
/// The result is clamped to [-1, 1] to absorb rounding.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    (dot / (mag_a * mag_b)).clamp(-1.0, 1.0)
}
