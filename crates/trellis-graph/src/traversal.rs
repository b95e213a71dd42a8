//! Bounded breadth-first traversal.
//!
//! Explores the graph layer by layer up to `max_depth` inclusive. A node's
//! recorded distance is the first (and therefore shortest) hop count at which
//! it is reached; visited nodes are never re-queued, so cycles terminate.
//!
//! Distance is hop count, not cumulative edge weight. The weight of the edge
//! that first discovered each node is reported alongside for weighted scoring.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::Serialize;

use trellis_core::error::Result;
use trellis_core::types::{Direction, EdgeId, NodeId, ProximityScoring};

use crate::store::GraphStore;

/// Parameters for a traversal.
#[derive(Debug, Clone)]
pub struct TraversalParams {
    /// Maximum hop distance, inclusive. Depth 0 yields only the start node.
    pub max_depth: usize,
    /// Which edge orientation to follow.
    pub direction: Direction,
    /// Restrict traversal to these relation labels (None = all).
    pub relations: Option<BTreeSet<String>>,
}

impl Default for TraversalParams {
    fn default() -> Self {
        Self {
            max_depth: 2,
            direction: Direction::Both,
            relations: None,
        }
    }
}

impl TraversalParams {
    /// Create params with a specific max depth.
    #[must_use]
    pub fn with_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Default::default()
        }
    }

    /// Builder: set direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Builder: only follow edges with one of these relation labels.
    #[must_use]
    pub fn relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations = Some(relations.into_iter().map(Into::into).collect());
        self
    }

    fn allows(&self, relation: &str) -> bool {
        self.relations
            .as_ref()
            .map_or(true, |allowed| allowed.contains(relation))
    }
}

/// The edge through which a node was first reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Via {
    pub edge: EdgeId,
    pub relation: String,
    pub weight: f64,
}

/// One reached node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reached {
    pub node: NodeId,
    pub hops: usize,
    /// `None` for the start node.
    pub via: Option<Via>,
}

impl Reached {
    /// Graph proximity of this node under the given scoring mode.
    pub fn score(&self, scoring: ProximityScoring) -> f64 {
        let base = graph_score(self.hops);
        match scoring {
            ProximityScoring::Hop => base,
            ProximityScoring::Weighted => base * self.via.as_ref().map_or(1.0, |v| v.weight),
        }
    }
}

/// Result of a traversal, in BFS visiting order.
#[derive(Debug, Clone, Serialize)]
pub struct TraversalResult {
    pub start: NodeId,
    pub max_depth: usize,
    pub reached: Vec<Reached>,
}

impl TraversalResult {
    /// Mapping from every reached node to its minimum hop distance.
    pub fn distances(&self) -> BTreeMap<NodeId, usize> {
        self.reached.iter().map(|r| (r.node, r.hops)).collect()
    }

    pub fn get(&self, node: NodeId) -> Option<&Reached> {
        self.reached.iter().find(|r| r.node == node)
    }

    /// Proximity score per reached node.
    pub fn scores(&self, scoring: ProximityScoring) -> BTreeMap<NodeId, f64> {
        self.reached
            .iter()
            .map(|r| (r.node, r.score(scoring)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.reached.len()
    }

    /// Never true for a successful traversal: the start node is always present.
    pub fn is_empty(&self) -> bool {
        self.reached.is_empty()
    }
}

/// Graph proximity for a node at `hops` from the start: `1 / (1 + hops)`.
pub fn graph_score(hops: usize) -> f64 {
    1.0 / (1.0 + hops as f64)
}

/// Breadth-first traversal from `start`.
///
/// # Errors
/// `NodeNotFound` if `start` does not exist.
pub fn traverse(store: &GraphStore, start: NodeId, params: &TraversalParams) -> Result<TraversalResult> {
    store.get_node(start)?;

    let mut visited: HashSet<NodeId> = HashSet::from([start]);
    let mut frontier: VecDeque<(NodeId, usize)> = VecDeque::from([(start, 0)]);
    let mut reached = vec![Reached {
        node: start,
        hops: 0,
        via: None,
    }];

    while let Some((node, hops)) = frontier.pop_front() {
        if hops >= params.max_depth {
            continue;
        }

        for (edge, neighbor) in store.neighbors(node, params.direction)? {
            if !params.allows(&edge.relation) || !visited.insert(neighbor) {
                continue;
            }
            reached.push(Reached {
                node: neighbor,
                hops: hops + 1,
                via: Some(Via {
                    edge: edge.id,
                    relation: edge.relation.clone(),
                    weight: edge.weight,
                }),
            });
            frontier.push_back((neighbor, hops + 1));
        }
    }

    tracing::debug!(start, reached = reached.len(), max_depth = params.max_depth, "Traversal complete");

    Ok(TraversalResult {
        start,
        max_depth: params.max_depth,
        reached,
    })
}
