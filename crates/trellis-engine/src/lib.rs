//! Trellis engine crate - consistent graph + vector store, hybrid ranking,
//! ingestion, and snapshot persistence.
//!
//! [`RetrievalEngine`] guards the graph store and the vector index with one
//! lock so readers never observe one updated without the other.
//! [`IngestPipeline`] drives the external embedding and extraction services.

pub mod engine;
pub mod hybrid;
pub mod pipeline;
pub mod snapshot;

pub use engine::{EngineStats, NodeEntry, RetrievalEngine};
pub use hybrid::{HybridHit, HybridQuery};
pub use pipeline::{IngestOutcome, IngestPipeline};
