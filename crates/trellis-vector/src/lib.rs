//! Trellis vector crate - embedding index, embedding providers, relation extraction.
//!
//! Provides an exact brute-force cosine similarity index keyed by node id,
//! the embedding provider trait with a deterministic mock and an Ollama
//! client, and the relation extractor trait with a pattern-based default.

pub mod embedding;
pub mod extraction;
pub mod index;

pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding, OllamaEmbedding};
pub use extraction::{normalize_name, DynRelationExtractor, PatternExtractor, RelationExtractor, Triple};
pub use index::{cosine_similarity, SearchHit, VectorIndex};
