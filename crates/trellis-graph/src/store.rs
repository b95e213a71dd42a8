//! Arena-backed node and edge store with referential integrity.
//!
//! Nodes and edges live in id-keyed maps. Edges reference their endpoints by
//! id only; per-node adjacency sets make neighbor lookups and cascade deletes
//! proportional to a node's degree.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use trellis_core::error::{Result, TrellisError};
use trellis_core::types::{Direction, Edge, EdgeId, Metadata, Node, NodeId};

/// Partial node update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub name: Option<String>,
    pub text: Option<String>,
    pub metadata: Option<Metadata>,
}

/// Exclusive owner of the node and edge collections.
#[derive(Debug, Clone)]
pub struct GraphStore {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    outgoing: HashMap<NodeId, BTreeSet<EdgeId>>,
    incoming: HashMap<NodeId, BTreeSet<EdgeId>>,
    next_node_id: NodeId,
    next_edge_id: EdgeId,
}

impl GraphStore {
    /// Create an empty store. The first node and edge ids are 1.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            next_node_id: 1,
            next_edge_id: 1,
        }
    }

    /// Rebuild a store from previously exported records.
    ///
    /// Fails without side effects on duplicate ids, dangling endpoints or
    /// invalid weights. Id allocation resumes after the largest imported id.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        let mut store = Self::new();

        for node in nodes {
            let id = node.id;
            if store.nodes.insert(id, node).is_some() {
                return Err(TrellisError::InvalidArgument(format!(
                    "duplicate node id {} in snapshot",
                    id
                )));
            }
        }

        for edge in edges {
            validate_weight(edge.weight)?;
            store.require_node(edge.source)?;
            store.require_node(edge.target)?;
            if store.edges.contains_key(&edge.id) {
                return Err(TrellisError::InvalidArgument(format!(
                    "duplicate edge id {} in snapshot",
                    edge.id
                )));
            }
            store.link(edge);
        }

        store.next_node_id = store.nodes.keys().next_back().map_or(1, |id| id + 1);
        store.next_edge_id = store.edges.keys().next_back().map_or(1, |id| id + 1);
        Ok(store)
    }

    // -------------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------------

    /// Allocate a fresh id and store the node. Always succeeds.
    pub fn create_node(&mut self, name: String, text: String, metadata: Metadata) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                name,
                text,
                metadata,
            },
        );
        debug!(node_id = id, "Node created");
        id
    }

    pub fn get_node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(TrellisError::NodeNotFound(id))
    }

    /// Apply a partial update.
    ///
    /// Returns `true` when the text actually changed, meaning the node's
    /// embedding is stale and must be replaced by the caller.
    pub fn update_node(&mut self, id: NodeId, update: NodeUpdate) -> Result<bool> {
        let node = self.nodes.get_mut(&id).ok_or(TrellisError::NodeNotFound(id))?;

        if let Some(name) = update.name {
            node.name = name;
        }
        let mut text_changed = false;
        if let Some(text) = update.text {
            text_changed = text != node.text;
            node.text = text;
        }
        if let Some(metadata) = update.metadata {
            node.metadata = metadata;
        }

        debug!(node_id = id, text_changed, "Node updated");
        Ok(text_changed)
    }

    /// Remove a node and every edge where it is the source or target.
    ///
    /// Returns the removed node and the removed edges in ascending id order.
    pub fn delete_node(&mut self, id: NodeId) -> Result<(Node, Vec<Edge>)> {
        let node = self.nodes.remove(&id).ok_or(TrellisError::NodeNotFound(id))?;

        let mut incident: BTreeSet<EdgeId> = self.outgoing.remove(&id).unwrap_or_default();
        incident.extend(self.incoming.remove(&id).unwrap_or_default());

        let mut removed = Vec::with_capacity(incident.len());
        for edge_id in incident {
            if let Some(edge) = self.unlink(edge_id) {
                removed.push(edge);
            }
        }

        debug!(node_id = id, edges_removed = removed.len(), "Node deleted");
        Ok((node, removed))
    }

    /// All nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // -------------------------------------------------------------------------
    // Edges
    // -------------------------------------------------------------------------

    /// Append a directed edge. Parallel edges between the same pair are allowed.
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        relation: String,
        weight: f64,
    ) -> Result<EdgeId> {
        self.require_node(source)?;
        self.require_node(target)?;
        validate_weight(weight)?;

        let id = self.next_edge_id;
        self.next_edge_id += 1;
        self.link(Edge {
            id,
            source,
            target,
            relation,
            weight,
        });
        debug!(edge_id = id, source, target, "Edge created");
        Ok(id)
    }

    pub fn get_edge(&self, id: EdgeId) -> Result<&Edge> {
        self.edges.get(&id).ok_or(TrellisError::EdgeNotFound(id))
    }

    /// Change an edge's relation label and/or weight.
    pub fn update_edge(
        &mut self,
        id: EdgeId,
        relation: Option<String>,
        weight: Option<f64>,
    ) -> Result<&Edge> {
        if let Some(w) = weight {
            validate_weight(w)?;
        }
        let edge = self.edges.get_mut(&id).ok_or(TrellisError::EdgeNotFound(id))?;
        if let Some(relation) = relation {
            edge.relation = relation;
        }
        if let Some(w) = weight {
            edge.weight = w;
        }
        Ok(edge)
    }

    pub fn delete_edge(&mut self, id: EdgeId) -> Result<Edge> {
        let edge = self.unlink(id).ok_or(TrellisError::EdgeNotFound(id))?;
        debug!(edge_id = id, "Edge deleted");
        Ok(edge)
    }

    /// All edges in ascending id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Every edge where `id` is the source or the target, ascending by edge id.
    pub fn incident_edges(&self, id: NodeId) -> Result<Vec<&Edge>> {
        Ok(self
            .neighbors(id, Direction::Both)?
            .into_iter()
            .map(|(edge, _)| edge)
            .collect())
    }

    /// Edges adjacent to `id` in the given direction, paired with the node on
    /// the far side, ascending by edge id.
    pub fn neighbors(&self, id: NodeId, direction: Direction) -> Result<Vec<(&Edge, NodeId)>> {
        self.require_node(id)?;

        let empty = BTreeSet::new();
        let out = self.outgoing.get(&id).unwrap_or(&empty);
        let inc = self.incoming.get(&id).unwrap_or(&empty);

        let ids: Vec<EdgeId> = match direction {
            Direction::Out => out.iter().copied().collect(),
            Direction::In => inc.iter().copied().collect(),
            Direction::Both => out.union(inc).copied().collect(),
        };

        Ok(ids
            .into_iter()
            .filter_map(|edge_id| self.edges.get(&edge_id))
            .map(|edge| {
                let neighbor = match direction {
                    Direction::Out => edge.target,
                    Direction::In => edge.source,
                    Direction::Both if edge.source == id => edge.target,
                    Direction::Both => edge.source,
                };
                (edge, neighbor)
            })
            .collect())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn require_node(&self, id: NodeId) -> Result<()> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(TrellisError::NodeNotFound(id))
        }
    }

    fn link(&mut self, edge: Edge) {
        self.outgoing.entry(edge.source).or_default().insert(edge.id);
        self.incoming.entry(edge.target).or_default().insert(edge.id);
        self.edges.insert(edge.id, edge);
    }

    fn unlink(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(&id)?;
        if let Some(set) = self.outgoing.get_mut(&edge.source) {
            set.remove(&id);
        }
        if let Some(set) = self.incoming.get_mut(&edge.target) {
            set.remove(&id);
        }
        Some(edge)
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Weights must be finite and non-negative.
fn validate_weight(weight: f64) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(TrellisError::InvalidWeight(weight))
    }
}
