//! Trellis graph crate - node/edge arena and bounded breadth-first traversal.
//!
//! The [`GraphStore`] owns every node and edge and keeps adjacency sets so
//! that cascade deletes are lookups rather than scans. [`traverse`] computes
//! minimum hop distances from a start node.

pub mod store;
pub mod traversal;

pub use store::{GraphStore, NodeUpdate};
pub use traversal::{graph_score, traverse, Reached, TraversalParams, TraversalResult, Via};
