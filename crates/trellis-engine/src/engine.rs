//! The retrieval engine: graph store and vector index behind a single lock.
//!
//! Every mutation takes the write lock for its whole duration, so a cascade
//! delete (node, embedding, incident edges) is never observed half-applied.
//! Reads share the read lock and may run concurrently.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::info;

use trellis_core::error::{Result, TrellisError};
use trellis_core::types::{
    Direction, Edge, EdgeId, Metadata, MetadataFilter, Node, NodeId, Snapshot, SnapshotNode,
    SNAPSHOT_VERSION,
};
use trellis_graph::{traverse, GraphStore, NodeUpdate, Reached, TraversalParams, TraversalResult};
use trellis_vector::{SearchHit, VectorIndex};

use crate::hybrid::{self, HybridHit, HybridQuery};

/// A node read together with whether it currently has an embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry {
    pub node: Node,
    pub has_embedding: bool,
}

/// Graph store and vector index, always mutated together.
#[derive(Debug, Default)]
pub(crate) struct Store {
    pub(crate) graph: GraphStore,
    pub(crate) vectors: VectorIndex,
}

impl Store {
    /// Predicate over node ids for an optional metadata filter.
    pub(crate) fn metadata_predicate<'a>(
        &'a self,
        filter: Option<&'a MetadataFilter>,
    ) -> impl Fn(NodeId) -> bool + 'a {
        move |id| match filter {
            None => true,
            Some(f) => self
                .graph
                .get_node(id)
                .map(|node| f.matches(&node.metadata))
                .unwrap_or(false),
        }
    }

    pub(crate) fn node_entry(&self, id: NodeId) -> Result<NodeEntry> {
        Ok(NodeEntry {
            node: self.graph.get_node(id)?.clone(),
            has_embedding: self.vectors.contains(id),
        })
    }

    /// Pair each hit with its node. Hits come from this same store, so every
    /// id resolves.
    fn attach_nodes<H>(&self, hits: Vec<H>, id: impl Fn(&H) -> NodeId) -> Result<Vec<(H, Node)>> {
        hits.into_iter()
            .map(|hit| {
                let node = self.graph.get_node(id(&hit))?.clone();
                Ok((hit, node))
            })
            .collect()
    }

    fn apply_update(
        &mut self,
        id: NodeId,
        update: NodeUpdate,
        embedding: Option<Vec<f32>>,
    ) -> Result<bool> {
        self.graph.get_node(id)?;
        if let Some(ref v) = embedding {
            self.vectors.check_vector(v)?;
        }

        let text_changed = self.graph.update_node(id, update)?;
        if text_changed {
            match embedding {
                Some(v) => self.vectors.set_embedding(id, v)?,
                None => {
                    self.vectors.remove_embedding(id);
                }
            }
        }
        Ok(text_changed)
    }
}

/// Point-in-time counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub nodes: usize,
    pub edges: usize,
    pub embeddings: usize,
    pub dimensions: Option<usize>,
}

/// Thread-safe retrieval engine.
///
/// Constructed once at startup and shared by reference (typically in an
/// `Arc`) with every component that reads or writes the store.
#[derive(Debug)]
pub struct RetrievalEngine {
    store: RwLock<Store>,
    /// Dimensionality pinned by configuration, kept across imports.
    pinned_dimensions: Option<usize>,
}

impl RetrievalEngine {
    /// Create an empty engine. The first stored embedding fixes D.
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
            pinned_dimensions: None,
        }
    }

    /// Create an empty engine with D fixed up front.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            store: RwLock::new(Store {
                graph: GraphStore::new(),
                vectors: VectorIndex::with_dimensions(dimensions),
            }),
            pinned_dimensions: Some(dimensions),
        }
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, Store>> {
        self.store
            .read()
            .map_err(|e| TrellisError::Storage(format!("Lock poisoned: {}", e)))
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, Store>> {
        self.store
            .write()
            .map_err(|e| TrellisError::Storage(format!("Lock poisoned: {}", e)))
    }

    // -------------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------------

    /// Create a node without an embedding. It takes no part in vector search
    /// until [`set_embedding`](Self::set_embedding) is called.
    pub fn create_node(&self, name: String, text: String, metadata: Metadata) -> Result<NodeId> {
        let mut store = self.write()?;
        Ok(store.graph.create_node(name, text, metadata))
    }

    /// Create a node and its embedding in one step. Nothing is stored if the
    /// vector is rejected.
    pub fn create_node_with_embedding(
        &self,
        name: String,
        text: String,
        metadata: Metadata,
        embedding: Vec<f32>,
    ) -> Result<NodeId> {
        let mut store = self.write()?;
        store.vectors.check_vector(&embedding)?;
        let id = store.graph.create_node(name, text, metadata);
        store.vectors.set_embedding(id, embedding)?;
        Ok(id)
    }

    pub fn get_node(&self, id: NodeId) -> Result<Node> {
        self.read()?.graph.get_node(id).cloned()
    }

    /// Node and its embedding flag, read under one guard.
    pub fn node_entry(&self, id: NodeId) -> Result<NodeEntry> {
        self.read()?.node_entry(id)
    }

    /// Node plus every edge where it is the source or target.
    pub fn node_with_edges(&self, id: NodeId) -> Result<(NodeEntry, Vec<Edge>)> {
        let store = self.read()?;
        let node = store.node_entry(id)?;
        let edges = store
            .graph
            .incident_edges(id)?
            .into_iter()
            .cloned()
            .collect();
        Ok((node, edges))
    }

    /// All nodes in ascending id order.
    pub fn list_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.read()?.graph.nodes().cloned().collect())
    }

    /// Partial update. When the text changes, the node's embedding is dropped
    /// in the same mutation; the caller must store a fresh one.
    ///
    /// Returns whether the text changed.
    pub fn update_node(&self, id: NodeId, update: NodeUpdate) -> Result<bool> {
        self.write()?.apply_update(id, update, None)
    }

    /// Partial update that also replaces the embedding when the text changes.
    ///
    /// If `embedding` is `None` and the text changed, the stale embedding is
    /// removed instead. The vector is validated before anything is modified.
    /// Returns the node as committed.
    pub fn update_node_with_embedding(
        &self,
        id: NodeId,
        update: NodeUpdate,
        embedding: Option<Vec<f32>>,
    ) -> Result<NodeEntry> {
        let mut store = self.write()?;
        store.apply_update(id, update, embedding)?;
        store.node_entry(id)
    }

    /// Delete a node, its embedding and every incident edge.
    ///
    /// Returns the removed node and edges.
    pub fn delete_node(&self, id: NodeId) -> Result<(Node, Vec<Edge>)> {
        let mut store = self.write()?;
        let (node, edges) = store.graph.delete_node(id)?;
        store.vectors.remove_embedding(id);
        info!(node_id = id, edges_removed = edges.len(), "Node deleted");
        Ok((node, edges))
    }

    // -------------------------------------------------------------------------
    // Edges
    // -------------------------------------------------------------------------

    pub fn create_edge(
        &self,
        source: NodeId,
        target: NodeId,
        relation: String,
        weight: f64,
    ) -> Result<Edge> {
        let mut store = self.write()?;
        let id = store.graph.create_edge(source, target, relation, weight)?;
        store.graph.get_edge(id).cloned()
    }

    pub fn get_edge(&self, id: EdgeId) -> Result<Edge> {
        self.read()?.graph.get_edge(id).cloned()
    }

    pub fn update_edge(
        &self,
        id: EdgeId,
        relation: Option<String>,
        weight: Option<f64>,
    ) -> Result<Edge> {
        let mut store = self.write()?;
        store.graph.update_edge(id, relation, weight).cloned()
    }

    pub fn delete_edge(&self, id: EdgeId) -> Result<Edge> {
        self.write()?.graph.delete_edge(id)
    }

    /// All edges in ascending id order.
    pub fn list_edges(&self) -> Result<Vec<Edge>> {
        Ok(self.read()?.graph.edges().cloned().collect())
    }

    /// Adjacent edges with the neighbor on the far side, ascending by edge id.
    pub fn neighbors(&self, id: NodeId, direction: Direction) -> Result<Vec<(Edge, NodeId)>> {
        Ok(self
            .read()?
            .graph
            .neighbors(id, direction)?
            .into_iter()
            .map(|(edge, neighbor)| (edge.clone(), neighbor))
            .collect())
    }

    // -------------------------------------------------------------------------
    // Embeddings
    // -------------------------------------------------------------------------

    /// Store or replace the embedding of an existing node.
    pub fn set_embedding(&self, id: NodeId, embedding: Vec<f32>) -> Result<()> {
        let mut store = self.write()?;
        store.graph.get_node(id)?;
        store.vectors.set_embedding(id, embedding)
    }

    /// Remove a node's embedding. No-op if it has none.
    pub fn remove_embedding(&self, id: NodeId) -> Result<()> {
        self.write()?.vectors.remove_embedding(id);
        Ok(())
    }

    pub fn dimensions(&self) -> Result<Option<usize>> {
        Ok(self.read()?.vectors.dimensions())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Exact top-`k` cosine similarity search, restricted to nodes whose
    /// metadata passes `filter`.
    pub fn vector_search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchHit>> {
        let store = self.read()?;
        store
            .vectors
            .search(query, k, store.metadata_predicate(filter))
    }

    /// [`Self::vector_search`] with each hit's node, resolved under the same
    /// read guard.
    pub fn vector_search_nodes(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<(SearchHit, Node)>> {
        let store = self.read()?;
        let hits = store
            .vectors
            .search(query, k, store.metadata_predicate(filter))?;
        store.attach_nodes(hits, |hit| hit.node_id)
    }

    /// Bounded BFS from `start`.
    pub fn traverse(&self, start: NodeId, params: &TraversalParams) -> Result<TraversalResult> {
        traverse(&self.read()?.graph, start, params)
    }

    /// [`Self::traverse`] with each reached node, in visit order.
    pub fn traverse_nodes(
        &self,
        start: NodeId,
        params: &TraversalParams,
    ) -> Result<Vec<(Reached, Node)>> {
        let store = self.read()?;
        let result = traverse(&store.graph, start, params)?;
        store.attach_nodes(result.reached, |reached| reached.node)
    }

    /// Combined vector + graph ranking. See [`HybridQuery`].
    pub fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<HybridHit>> {
        let store = self.read()?;
        hybrid::rank(&store, query)
    }

    /// [`Self::hybrid_search`] with each hit's node, resolved under the same
    /// read guard.
    pub fn hybrid_search_nodes(&self, query: &HybridQuery) -> Result<Vec<(HybridHit, Node)>> {
        let store = self.read()?;
        let hits = hybrid::rank(&store, query)?;
        store.attach_nodes(hits, |hit| hit.node_id)
    }

    pub fn stats(&self) -> Result<EngineStats> {
        let store = self.read()?;
        Ok(EngineStats {
            nodes: store.graph.node_count(),
            edges: store.graph.edge_count(),
            embeddings: store.vectors.len(),
            dimensions: store.vectors.dimensions(),
        })
    }

    // -------------------------------------------------------------------------
    // Snapshot
    // -------------------------------------------------------------------------

    /// Export every node (with its embedding) and every edge.
    pub fn export_snapshot(&self) -> Result<Snapshot> {
        let store = self.read()?;
        Ok(Snapshot {
            version: SNAPSHOT_VERSION,
            dimensions: store.vectors.dimensions(),
            nodes: store
                .graph
                .nodes()
                .map(|node| SnapshotNode {
                    node: node.clone(),
                    embedding: store.vectors.get(node.id).map(<[f32]>::to_vec),
                })
                .collect(),
            edges: store.graph.edges().cloned().collect(),
        })
    }

    /// Replace the whole state with `snapshot`.
    ///
    /// The snapshot is fully validated first; on any error the current state
    /// is left untouched.
    pub fn import_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(TrellisError::InvalidArgument(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let dimensions = match (self.pinned_dimensions, snapshot.dimensions) {
            (Some(pinned), Some(found)) if pinned != found => {
                return Err(TrellisError::DimensionMismatch {
                    expected: pinned,
                    actual: found,
                })
            }
            (pinned, found) => pinned.or(found),
        };

        let mut vectors = match dimensions {
            Some(d) => VectorIndex::with_dimensions(d),
            None => VectorIndex::new(),
        };
        let mut nodes = Vec::with_capacity(snapshot.nodes.len());
        for record in snapshot.nodes {
            if let Some(embedding) = record.embedding {
                vectors.set_embedding(record.node.id, embedding)?;
            }
            nodes.push(record.node);
        }
        let graph = GraphStore::from_parts(nodes, snapshot.edges)?;

        let mut store = self.write()?;
        *store = Store { graph, vectors };
        info!(
            nodes = store.graph.node_count(),
            edges = store.graph.edge_count(),
            embeddings = store.vectors.len(),
            "Snapshot imported"
        );
        Ok(())
    }
}

impl Default for RetrievalEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trellis_core::types::MetadataValue;

    fn meta(key: &str, value: &str) -> Metadata {
        Metadata::from([(key.to_string(), MetadataValue::from(value))])
    }

    #[test]
    fn test_create_node_with_embedding_is_all_or_nothing() {
        let engine = RetrievalEngine::with_dimensions(3);
        let err = engine
            .create_node_with_embedding("a".into(), "a".into(), Metadata::new(), vec![1.0; 2])
            .unwrap_err();
        assert!(matches!(err, TrellisError::DimensionMismatch { .. }));
        assert_eq!(engine.stats().unwrap().nodes, 0);

        let id = engine
            .create_node_with_embedding("a".into(), "a".into(), Metadata::new(), vec![1.0; 3])
            .unwrap();
        assert!(engine.node_entry(id).unwrap().has_embedding);
    }

    #[test]
    fn test_set_embedding_requires_node() {
        let engine = RetrievalEngine::new();
        assert!(matches!(
            engine.set_embedding(7, vec![1.0]),
            Err(TrellisError::NodeNotFound(7))
        ));
        assert_eq!(engine.dimensions().unwrap(), None);
    }

    #[test]
    fn test_delete_node_removes_embedding_and_edges() {
        let engine = RetrievalEngine::new();
        let a = engine
            .create_node_with_embedding("a".into(), "a".into(), Metadata::new(), vec![1.0, 0.0])
            .unwrap();
        let b = engine
            .create_node_with_embedding("b".into(), "b".into(), Metadata::new(), vec![1.0, 0.1])
            .unwrap();
        let c = engine.create_node("c".into(), "c".into(), Metadata::new()).unwrap();
        engine.create_edge(a, b, "x".into(), 1.0).unwrap();
        engine.create_edge(c, a, "y".into(), 1.0).unwrap();
        engine.create_edge(b, c, "z".into(), 1.0).unwrap();

        let (_, removed) = engine.delete_node(a).unwrap();
        assert_eq!(removed.len(), 2);

        let hits = engine.vector_search(&[1.0, 0.0], 10, None).unwrap();
        assert_eq!(hits.iter().map(|h| h.node_id).collect::<Vec<_>>(), vec![b]);

        assert!(engine
            .list_edges()
            .unwrap()
            .iter()
            .all(|e| e.source != a && e.target != a));

        let reached = engine.traverse(b, &TraversalParams::with_depth(5)).unwrap();
        assert!(!reached.distances().contains_key(&a));
        assert!(matches!(engine.traverse(a, &TraversalParams::default()), Err(TrellisError::NodeNotFound(_))));
    }

    #[test]
    fn test_text_update_invalidates_embedding() {
        let engine = RetrievalEngine::new();
        let a = engine
            .create_node_with_embedding("a".into(), "old".into(), Metadata::new(), vec![1.0, 0.0])
            .unwrap();

        let changed = engine
            .update_node(
                a,
                NodeUpdate {
                    metadata: Some(meta("k", "v")),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!changed);
        assert!(engine.node_entry(a).unwrap().has_embedding);

        let changed = engine
            .update_node(
                a,
                NodeUpdate {
                    text: Some("new".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(changed);
        assert!(!engine.node_entry(a).unwrap().has_embedding);
        assert!(engine.vector_search(&[1.0, 0.0], 5, None).unwrap().is_empty());
    }

    #[test]
    fn test_update_with_bad_embedding_changes_nothing() {
        let engine = RetrievalEngine::new();
        let a = engine
            .create_node_with_embedding("a".into(), "old".into(), Metadata::new(), vec![1.0, 0.0])
            .unwrap();
        let err = engine
            .update_node_with_embedding(
                a,
                NodeUpdate {
                    text: Some("new".into()),
                    ..Default::default()
                },
                Some(vec![1.0; 5]),
            )
            .unwrap_err();
        assert!(matches!(err, TrellisError::DimensionMismatch { .. }));
        assert_eq!(engine.get_node(a).unwrap().text, "old");
        assert!(engine.node_entry(a).unwrap().has_embedding);
    }

    #[test]
    fn test_vector_search_metadata_filter() {
        let engine = RetrievalEngine::new();
        let fire = engine
            .create_node_with_embedding("Charmander".into(), "c".into(), meta("type1", "fire"), vec![0.9, 0.1])
            .unwrap();
        engine
            .create_node_with_embedding("Squirtle".into(), "s".into(), meta("type1", "water"), vec![1.0, 0.0])
            .unwrap();

        let filter = MetadataFilter::eq("type1", "fire");
        let hits = engine.vector_search(&[1.0, 0.0], 1, Some(&filter)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node_id, fire);
    }

    #[test]
    fn test_neighbors_and_remove_embedding() {
        let engine = RetrievalEngine::new();
        let a = engine
            .create_node_with_embedding("a".into(), "a".into(), Metadata::new(), vec![1.0, 0.0])
            .unwrap();
        let b = engine.create_node("b".into(), String::new(), Metadata::new()).unwrap();
        let edge = engine.create_edge(a, b, "x".into(), 1.0).unwrap();

        let out = engine.neighbors(a, Direction::Out).unwrap();
        assert_eq!(out, vec![(edge.clone(), b)]);
        assert!(engine.neighbors(a, Direction::In).unwrap().is_empty());
        assert_eq!(engine.neighbors(b, Direction::Both).unwrap(), vec![(edge, a)]);

        engine.remove_embedding(a).unwrap();
        assert!(!engine.node_entry(a).unwrap().has_embedding);
        assert_eq!(engine.dimensions().unwrap(), Some(2), "D stays fixed");
        engine.remove_embedding(a).unwrap();
    }

    #[test]
    fn test_node_with_edges() {
        let engine = RetrievalEngine::new();
        let a = engine.create_node("a".into(), String::new(), Metadata::new()).unwrap();
        let b = engine.create_node("b".into(), String::new(), Metadata::new()).unwrap();
        engine.create_edge(a, b, "x".into(), 1.0).unwrap();
        let (entry, edges) = engine.node_with_edges(b).unwrap();
        assert_eq!(entry.node.name, "b");
        assert!(!entry.has_embedding);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let engine = RetrievalEngine::new();
        let a = engine
            .create_node_with_embedding("a".into(), "a".into(), meta("k", "v"), vec![1.0, 2.0])
            .unwrap();
        let b = engine.create_node("b".into(), "b".into(), Metadata::new()).unwrap();
        engine.create_edge(a, b, "x".into(), 0.5).unwrap();

        let snapshot = engine.export_snapshot().unwrap();
        assert_eq!(snapshot.dimensions, Some(2));

        let restored = RetrievalEngine::new();
        restored.import_snapshot(snapshot.clone()).unwrap();
        assert_eq!(restored.export_snapshot().unwrap(), snapshot);
        assert_eq!(
            restored.stats().unwrap(),
            EngineStats {
                nodes: 2,
                edges: 1,
                embeddings: 1,
                dimensions: Some(2)
            }
        );
        let c = restored.create_node("c".into(), String::new(), Metadata::new()).unwrap();
        assert_eq!(c, 3);
    }

    #[test]
    fn test_invalid_snapshot_leaves_state_untouched() {
        let engine = RetrievalEngine::new();
        engine.create_node("keep".into(), String::new(), Metadata::new()).unwrap();

        let mut snapshot = Snapshot::default();
        snapshot.edges.push(Edge {
            id: 1,
            source: 1,
            target: 2,
            relation: "x".into(),
            weight: 1.0,
        });
        assert!(engine.import_snapshot(snapshot).is_err());
        assert_eq!(engine.list_nodes().unwrap()[0].name, "keep");
    }

    #[test]
    fn test_import_respects_pinned_dimensions() {
        let engine = RetrievalEngine::with_dimensions(4);
        let snapshot = Snapshot {
            dimensions: Some(3),
            ..Default::default()
        };
        assert!(matches!(
            engine.import_snapshot(snapshot),
            Err(TrellisError::DimensionMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_readers_never_see_partial_delete() {
        let engine = Arc::new(RetrievalEngine::new());
        let hub = engine
            .create_node_with_embedding("hub".into(), "hub".into(), Metadata::new(), vec![1.0, 0.0])
            .unwrap();
        for i in 0..50 {
            let n = engine.create_node(format!("n{}", i), String::new(), Metadata::new()).unwrap();
            engine.create_edge(hub, n, "spoke".into(), 1.0).unwrap();
        }

        let reader = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let snapshot = engine.export_snapshot().unwrap();
                    let hub_present = snapshot.nodes.iter().any(|n| n.node.id == hub);
                    let hub_edges = snapshot
                        .edges
                        .iter()
                        .filter(|e| e.source == hub || e.target == hub)
                        .count();
                    assert!(
                        (hub_present && hub_edges == 50) || (!hub_present && hub_edges == 0),
                        "observed a partial cascade: present={} edges={}",
                        hub_present,
                        hub_edges
                    );
                }
            })
        };

        engine.delete_node(hub).unwrap();
        reader.join().unwrap();
    }

    #[test]
    fn test_search_results_resolve_nodes_during_deletes() {
        let engine = Arc::new(RetrievalEngine::new());
        let hub = engine
            .create_node_with_embedding("hub".into(), "hub".into(), Metadata::new(), vec![1.0, 0.0])
            .unwrap();
        let mut spokes = Vec::new();
        for i in 0..40 {
            let n = engine
                .create_node_with_embedding(format!("n{}", i), String::new(), Metadata::new(), vec![1.0, 0.1])
                .unwrap();
            engine.create_edge(hub, n, "spoke".into(), 1.0).unwrap();
            spokes.push(n);
        }

        let reader = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let query = HybridQuery::new(vec![1.0, 0.0]).start(hub).alpha(0.5).k(50);
                for _ in 0..200 {
                    for (hit, node) in engine.hybrid_search_nodes(&query).unwrap() {
                        assert_eq!(hit.node_id, node.id);
                    }
                    for (hit, node) in engine.vector_search_nodes(&[1.0, 0.0], 50, None).unwrap() {
                        assert_eq!(hit.node_id, node.id);
                    }
                    for (reached, node) in engine
                        .traverse_nodes(hub, &TraversalParams::with_depth(1))
                        .unwrap()
                    {
                        assert_eq!(reached.node, node.id);
                    }
                }
            })
        };

        for id in spokes {
            engine.delete_node(id).unwrap();
        }
        reader.join().unwrap();
        assert_eq!(engine.hybrid_search_nodes(&HybridQuery::new(vec![1.0, 0.0]).start(hub)).unwrap().len(), 1);
    }

    #[test]
    fn test_update_returns_committed_entry() {
        let engine = RetrievalEngine::new();
        let a = engine
            .create_node_with_embedding("a".into(), "old".into(), Metadata::new(), vec![1.0, 0.0])
            .unwrap();
        let entry = engine
            .update_node_with_embedding(
                a,
                NodeUpdate {
                    text: Some("new".into()),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        assert_eq!(entry.node.text, "new");
        assert!(!entry.has_embedding);
        assert_eq!(engine.node_entry(a).unwrap(), entry);
    }
}
