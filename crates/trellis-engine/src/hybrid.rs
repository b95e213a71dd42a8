//! Hybrid ranking: blend vector similarity with graph proximity.
//!
//! `final = alpha * vector_score + (1 - alpha) * graph_score`
//!
//! The candidate set is the union of the vector top-M (M = k * overfetch)
//! and every node reachable from the anchor within `max_depth`. Every
//! candidate is scored on both signals before the final top-k is cut, so a
//! node ranked just outside the vector top-k can still win on proximity.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use trellis_core::error::{Result, TrellisError};
use trellis_core::types::{Direction, MetadataFilter, NodeId, ProximityScoring};
use trellis_graph::{traverse, TraversalParams};

use crate::engine::Store;

/// Default oversampling of the vector candidate list relative to `k`.
pub const DEFAULT_OVERFETCH: usize = 3;

/// Parameters of a hybrid search.
#[derive(Debug, Clone)]
pub struct HybridQuery {
    pub vector: Vec<f32>,
    /// Traversal anchor. When absent, the best vector hit passing `filter`
    /// is used.
    pub start: Option<NodeId>,
    /// Vector weight in [0, 1].
    pub alpha: f64,
    pub max_depth: usize,
    pub k: usize,
    pub direction: Direction,
    pub relations: Option<BTreeSet<String>>,
    pub filter: Option<MetadataFilter>,
    pub scoring: ProximityScoring,
    pub overfetch: usize,
}

impl HybridQuery {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            start: None,
            alpha: 0.7,
            max_depth: 2,
            k: 5,
            direction: Direction::Both,
            relations: None,
            filter: None,
            scoring: ProximityScoring::Hop,
            overfetch: DEFAULT_OVERFETCH,
        }
    }

    pub fn start(mut self, start: NodeId) -> Self {
        self.start = Some(start);
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn scoring(mut self, scoring: ProximityScoring) -> Self {
        self.scoring = scoring;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(TrellisError::InvalidArgument(format!(
                "alpha must be within [0, 1], got {}",
                self.alpha
            )));
        }
        if self.overfetch == 0 {
            return Err(TrellisError::InvalidArgument(
                "overfetch must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A ranked hybrid result with both component scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridHit {
    pub node_id: NodeId,
    pub score: f64,
    pub vector_score: f64,
    pub graph_score: f64,
    /// Hop distance from the anchor, if reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hops: Option<usize>,
}

pub(crate) fn rank(store: &Store, query: &HybridQuery) -> Result<Vec<HybridHit>> {
    query.validate()?;
    store.vectors.check_query(&query.vector)?;
    if let Some(start) = query.start {
        store.graph.get_node(start)?;
    }
    if query.k == 0 {
        return Ok(Vec::new());
    }

    let passes = store.metadata_predicate(query.filter.as_ref());

    if query.alpha == 1.0 {
        return Ok(store
            .vectors
            .search(&query.vector, query.k, &passes)?
            .into_iter()
            .map(|hit| HybridHit {
                node_id: hit.node_id,
                score: hit.score,
                vector_score: hit.score,
                graph_score: 0.0,
                hops: None,
            })
            .collect());
    }

    let vector_hits: BTreeMap<NodeId, f64> = if query.alpha > 0.0 || query.start.is_none() {
        let m = query.k.saturating_mul(query.overfetch);
        store
            .vectors
            .search(&query.vector, m, &passes)?
            .into_iter()
            .map(|hit| (hit.node_id, hit.score))
            .collect()
    } else {
        BTreeMap::new()
    };

    let anchor = query.start.or_else(|| {
        vector_hits
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(id, _)| *id)
    });

    let mut proximity: BTreeMap<NodeId, (f64, usize)> = BTreeMap::new();
    if let Some(anchor) = anchor {
        let params = TraversalParams {
            max_depth: query.max_depth,
            direction: query.direction,
            relations: query.relations.clone(),
        };
        for reached in traverse(&store.graph, anchor, &params)?.reached {
            if passes(reached.node) {
                proximity.insert(reached.node, (reached.score(query.scoring), reached.hops));
            }
        }
    }
    debug!(
        anchor = ?anchor,
        vector_candidates = vector_hits.len(),
        graph_candidates = proximity.len(),
        "Hybrid candidates collected"
    );

    let mut hits: Vec<HybridHit> = if query.alpha == 0.0 {
        proximity
            .iter()
            .map(|(&node_id, &(graph_score, hops))| HybridHit {
                node_id,
                score: graph_score,
                vector_score: 0.0,
                graph_score,
                hops: Some(hops),
            })
            .collect()
    } else {
        let candidates: BTreeSet<NodeId> =
            vector_hits.keys().chain(proximity.keys()).copied().collect();
        candidates
            .into_iter()
            .map(|node_id| {
                let vector_score = match vector_hits.get(&node_id) {
                    Some(&score) => score,
                    None => store.vectors.score(&query.vector, node_id).unwrap_or(0.0),
                };
                let (graph_score, hops) = match proximity.get(&node_id) {
                    Some(&(score, hops)) => (score, Some(hops)),
                    None => (0.0, None),
                };
                HybridHit {
                    node_id,
                    score: query.alpha * vector_score + (1.0 - query.alpha) * graph_score,
                    vector_score,
                    graph_score,
                    hops,
                }
            })
            .collect()
    };

    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.node_id.cmp(&b.node_id))
    });
    hits.truncate(query.k);
    Ok(hits)
}
