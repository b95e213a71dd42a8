//! Route handler functions for all API endpoints.
//!
//! Each handler extracts query/path parameters via axum extractors, calls the
//! engine or the ingest pipeline, and returns JSON responses. Mutating
//! handlers persist a snapshot afterwards when persistence is enabled.

use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use trellis_core::error::TrellisError;
use trellis_core::types::{
    Direction, Edge, EdgeId, Metadata, MetadataFilter, NodeId, ProximityScoring, Snapshot,
    DEFAULT_WEIGHT,
};
use trellis_engine::{HybridQuery, NodeEntry};
use trellis_graph::{NodeUpdate, TraversalParams};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Query parameter and request types
// =============================================================================

/// GET /search/vector
#[derive(Debug, Deserialize)]
pub struct VectorSearchParams {
    pub query: String,
    pub top_k: Option<i64>,
}

/// POST /search/vector
#[derive(Debug, Deserialize)]
pub struct VectorSearchRequest {
    pub query_text: Option<String>,
    pub query_vector: Option<Vec<f32>>,
    pub top_k: Option<i64>,
    pub filter: Option<MetadataFilter>,
}

/// GET /search/graph
#[derive(Debug, Deserialize)]
pub struct GraphSearchParams {
    pub start_id: NodeId,
    pub depth: Option<i64>,
    pub rel_type: Option<String>,
    pub direction: Option<Direction>,
}

/// GET /search/hybrid
#[derive(Debug, Deserialize)]
pub struct HybridSearchParams {
    pub query: String,
    pub top_k: Option<i64>,
    pub focus_id: Option<NodeId>,
    pub depth: Option<i64>,
    pub alpha: Option<f64>,
}

/// POST /search/hybrid
#[derive(Debug, Default, Deserialize)]
pub struct HybridSearchRequest {
    pub query_text: Option<String>,
    pub query_vector: Option<Vec<f32>>,
    pub top_k: Option<i64>,
    pub focus_id: Option<NodeId>,
    pub bfs_depth: Option<i64>,
    pub alpha: Option<f64>,
    pub direction: Option<Direction>,
    pub rel_types: Option<Vec<String>>,
    pub filter: Option<MetadataFilter>,
    pub proximity: Option<ProximityScoring>,
}

/// POST /nodes
#[derive(Debug, Deserialize)]
pub struct NodeCreateRequest {
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// PUT /nodes/{id}
#[derive(Debug, Deserialize)]
pub struct NodeUpdateRequest {
    pub name: Option<String>,
    pub text: Option<String>,
    pub metadata: Option<Metadata>,
}

/// POST /edges
#[derive(Debug, Deserialize)]
pub struct EdgeCreateRequest {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "type")]
    pub relation: Option<String>,
    pub weight: Option<f64>,
}

/// PUT /edges/{id}
#[derive(Debug, Deserialize)]
pub struct EdgeUpdateRequest {
    #[serde(rename = "type")]
    pub relation: Option<String>,
    pub weight: Option<f64>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub nodes: usize,
    pub edges: usize,
    pub embeddings: usize,
    pub dimensions: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeResponse {
    pub id: NodeId,
    pub name: String,
    pub text: String,
    pub metadata: Metadata,
    pub has_embedding: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeCreatedResponse {
    pub status: String,
    pub node: NodeResponse,
    pub auto_edges_created: Vec<Edge>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeDetailResponse {
    pub node: NodeResponse,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeUpdatedResponse {
    pub status: String,
    pub node: NodeResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeResponse {
    pub status: String,
    pub edge: Edge,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VectorResult {
    pub node_id: NodeId,
    pub name: String,
    pub text: String,
    pub metadata: Metadata,
    pub score: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VectorSearchResponse {
    pub results: Vec<VectorResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VisitedNode {
    pub node_id: NodeId,
    pub name: String,
    pub hops: usize,
    pub score: f64,
    /// Edge through which the node was first reached (absent for the start).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_edge: Option<EdgeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphSearchResponse {
    pub start_id: NodeId,
    pub depth: usize,
    pub rel_type: Option<String>,
    pub visited: Vec<VisitedNode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HybridResult {
    pub node_id: NodeId,
    pub name: String,
    pub text: String,
    pub score: f64,
    pub vector_score: f64,
    pub graph_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hops: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HybridSearchResponse {
    pub results: Vec<HybridResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotImportResponse {
    pub status: String,
    pub nodes: usize,
    pub edges: usize,
}

// =============================================================================
// Helpers
// =============================================================================

/// Convert a signed query parameter to a count, rejecting negatives.
fn non_negative(name: &str, value: Option<i64>, default: usize) -> Result<usize, ApiError> {
    match value {
        None => Ok(default),
        Some(v) => usize::try_from(v).map_err(|_| {
            TrellisError::InvalidArgument(format!("'{}' must be non-negative, got {}", name, v))
                .into()
        }),
    }
}

impl From<NodeEntry> for NodeResponse {
    fn from(NodeEntry { node, has_embedding }: NodeEntry) -> Self {
        Self {
            id: node.id,
            name: node.name,
            text: node.text,
            metadata: node.metadata,
            has_embedding,
        }
    }
}

/// The query vector, embedding `text` when no raw vector is given.
async fn query_vector(
    state: &AppState,
    text: Option<String>,
    vector: Option<Vec<f32>>,
) -> Result<Vec<f32>, ApiError> {
    match (vector, text) {
        (Some(vector), _) => Ok(vector),
        (None, Some(text)) => Ok(state.pipeline.embed_query(&text).await?),
        (None, None) => Err(ApiError::BadRequest(
            "one of 'query_text' or 'query_vector' is required".to_string(),
        )),
    }
}

async fn run_vector_search(
    state: &AppState,
    vector: Vec<f32>,
    k: usize,
    filter: Option<MetadataFilter>,
) -> Result<Json<VectorSearchResponse>, ApiError> {
    let results = state
        .engine
        .vector_search_nodes(&vector, k, filter.as_ref())?
        .into_iter()
        .map(|(hit, node)| VectorResult {
            node_id: node.id,
            name: node.name,
            text: node.text,
            metadata: node.metadata,
            score: hit.score,
        })
        .collect();
    Ok(Json(VectorSearchResponse { results }))
}

async fn run_hybrid_search(
    state: &AppState,
    query: HybridQuery,
) -> Result<Json<HybridSearchResponse>, ApiError> {
    let results = state
        .engine
        .hybrid_search_nodes(&query)?
        .into_iter()
        .map(|(hit, node)| HybridResult {
            node_id: hit.node_id,
            name: node.name,
            text: node.text,
            score: hit.score,
            vector_score: hit.vector_score,
            graph_score: hit.graph_score,
            hops: hit.hops,
        })
        .collect();
    Ok(Json(HybridSearchResponse { results }))
}

/// A hybrid query pre-filled with the configured defaults.
fn default_hybrid_query(state: &AppState, vector: Vec<f32>) -> HybridQuery {
    let search = &state.config.search;
    let mut query = HybridQuery::new(vector)
        .alpha(search.default_alpha)
        .max_depth(search.default_depth)
        .k(search.default_k)
        .direction(search.default_direction)
        .scoring(search.proximity);
    query.overfetch = search.overfetch_factor;
    query
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - liveness plus store counters.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let stats = state.engine.stats()?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        nodes: stats.nodes,
        edges: stats.edges,
        embeddings: stats.embeddings,
        dimensions: stats.dimensions,
    }))
}

// =============================================================================
// Node CRUD
// =============================================================================

/// POST /nodes - ingest text as a node, creating edges to known names.
pub async fn create_node(
    State(state): State<AppState>,
    Json(body): Json<NodeCreateRequest>,
) -> Result<(StatusCode, Json<NodeCreatedResponse>), ApiError> {
    let outcome = state
        .pipeline
        .ingest(&body.text, &body.name, body.metadata)
        .await?;
    state.persist();

    Ok((
        StatusCode::CREATED,
        Json(NodeCreatedResponse {
            status: "created".to_string(),
            node: NodeEntry {
                node: outcome.node,
                has_embedding: true,
            }
            .into(),
            auto_edges_created: outcome.edges,
        }),
    ))
}

/// GET /nodes/{id} - node with every incident edge.
pub async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<NodeId>,
) -> Result<Json<NodeDetailResponse>, ApiError> {
    let (entry, edges) = state.engine.node_with_edges(id)?;
    Ok(Json(NodeDetailResponse {
        node: entry.into(),
        edges,
    }))
}

/// PUT /nodes/{id} - partial update; new text is re-embedded.
pub async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<NodeId>,
    Json(body): Json<NodeUpdateRequest>,
) -> Result<Json<NodeUpdatedResponse>, ApiError> {
    let update = NodeUpdate {
        name: body.name,
        text: body.text,
        metadata: body.metadata,
    };
    let entry = state.pipeline.update_node(id, update).await?;
    state.persist();

    Ok(Json(NodeUpdatedResponse {
        status: "updated".to_string(),
        node: entry.into(),
    }))
}

/// DELETE /nodes/{id} - remove the node, its embedding and incident edges.
pub async fn delete_node(
    State(state): State<AppState>,
    Path(id): Path<NodeId>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_node(id)?;
    state.persist();
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Edge CRUD
// =============================================================================

/// POST /edges
pub async fn create_edge(
    State(state): State<AppState>,
    Json(body): Json<EdgeCreateRequest>,
) -> Result<(StatusCode, Json<EdgeResponse>), ApiError> {
    let relation = body
        .relation
        .unwrap_or_else(|| state.config.ingest.default_relation.clone());
    let edge = state.engine.create_edge(
        body.source,
        body.target,
        relation,
        body.weight.unwrap_or(DEFAULT_WEIGHT),
    )?;
    state.persist();

    Ok((
        StatusCode::CREATED,
        Json(EdgeResponse {
            status: "created".to_string(),
            edge,
        }),
    ))
}

/// GET /edges/{id}
pub async fn get_edge(
    State(state): State<AppState>,
    Path(id): Path<EdgeId>,
) -> Result<Json<Edge>, ApiError> {
    Ok(Json(state.engine.get_edge(id)?))
}

/// PUT /edges/{id}
pub async fn update_edge(
    State(state): State<AppState>,
    Path(id): Path<EdgeId>,
    Json(body): Json<EdgeUpdateRequest>,
) -> Result<Json<EdgeResponse>, ApiError> {
    let edge = state.engine.update_edge(id, body.relation, body.weight)?;
    state.persist();
    Ok(Json(EdgeResponse {
        status: "updated".to_string(),
        edge,
    }))
}

/// DELETE /edges/{id}
pub async fn delete_edge(
    State(state): State<AppState>,
    Path(id): Path<EdgeId>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_edge(id)?;
    state.persist();
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Search
// =============================================================================

/// GET /search/vector?query=...&top_k=5
pub async fn search_vector_get(
    State(state): State<AppState>,
    Query(params): Query<VectorSearchParams>,
) -> Result<Json<VectorSearchResponse>, ApiError> {
    let k = non_negative("top_k", params.top_k, state.config.search.default_k)?;
    let vector = state.pipeline.embed_query(&params.query).await?;
    run_vector_search(&state, vector, k, None).await
}

/// POST /search/vector - text or raw vector, optional metadata filter.
pub async fn search_vector_post(
    State(state): State<AppState>,
    Json(body): Json<VectorSearchRequest>,
) -> Result<Json<VectorSearchResponse>, ApiError> {
    let k = non_negative("top_k", body.top_k, state.config.search.default_k)?;
    let vector = query_vector(&state, body.query_text, body.query_vector).await?;
    run_vector_search(&state, vector, k, body.filter).await
}

/// GET /search/graph?start_id=1&depth=2&rel_type=located_in
pub async fn search_graph(
    State(state): State<AppState>,
    Query(params): Query<GraphSearchParams>,
) -> Result<Json<GraphSearchResponse>, ApiError> {
    let depth = non_negative("depth", params.depth, state.config.search.default_depth)?;
    let mut traversal = TraversalParams::with_depth(depth)
        .direction(params.direction.unwrap_or(state.config.search.default_direction));
    if let Some(ref rel) = params.rel_type {
        traversal = traversal.relations([rel.clone()]);
    }

    let scoring = state.config.search.proximity;
    let visited = state
        .engine
        .traverse_nodes(params.start_id, &traversal)?
        .into_iter()
        .map(|(reached, node)| VisitedNode {
            node_id: reached.node,
            name: node.name,
            hops: reached.hops,
            score: reached.score(scoring),
            via_edge: reached.via.as_ref().map(|v| v.edge),
            via_type: reached.via.map(|v| v.relation),
        })
        .collect();

    Ok(Json(GraphSearchResponse {
        start_id: params.start_id,
        depth,
        rel_type: params.rel_type,
        visited,
    }))
}

/// GET /search/hybrid?query=...&top_k=5&focus_id=1&depth=2&alpha=0.7
pub async fn search_hybrid_get(
    State(state): State<AppState>,
    Query(params): Query<HybridSearchParams>,
) -> Result<Json<HybridSearchResponse>, ApiError> {
    let vector = state.pipeline.embed_query(&params.query).await?;
    let search = &state.config.search;
    let mut query = default_hybrid_query(&state, vector)
        .k(non_negative("top_k", params.top_k, search.default_k)?)
        .max_depth(non_negative("depth", params.depth, search.default_depth)?)
        .alpha(params.alpha.unwrap_or(search.default_alpha));
    query.start = params.focus_id;
    run_hybrid_search(&state, query).await
}

/// POST /search/hybrid - full control over direction, filter and scoring.
pub async fn search_hybrid_post(
    State(state): State<AppState>,
    Json(body): Json<HybridSearchRequest>,
) -> Result<Json<HybridSearchResponse>, ApiError> {
    let vector = query_vector(&state, body.query_text, body.query_vector).await?;
    let search = &state.config.search;
    let mut query = default_hybrid_query(&state, vector)
        .k(non_negative("top_k", body.top_k, search.default_k)?)
        .max_depth(non_negative("bfs_depth", body.bfs_depth, search.default_depth)?)
        .alpha(body.alpha.unwrap_or(search.default_alpha));
    query.start = body.focus_id;
    if let Some(direction) = body.direction {
        query = query.direction(direction);
    }
    if let Some(proximity) = body.proximity {
        query = query.scoring(proximity);
    }
    if let Some(filter) = body.filter {
        query = query.filter(filter);
    }
    query.relations = body.rel_types.map(|r| r.into_iter().collect::<BTreeSet<_>>());
    run_hybrid_search(&state, query).await
}

// =============================================================================
// Snapshot
// =============================================================================

/// GET /snapshot - export every node, embedding and edge.
pub async fn export_snapshot(State(state): State<AppState>) -> Result<Json<Snapshot>, ApiError> {
    Ok(Json(state.engine.export_snapshot()?))
}

/// PUT /snapshot - replace the whole store. Invalid snapshots change nothing.
pub async fn import_snapshot(
    State(state): State<AppState>,
    Json(snapshot): Json<Snapshot>,
) -> Result<Json<SnapshotImportResponse>, ApiError> {
    state.engine.import_snapshot(snapshot)?;
    state.persist();
    let stats = state.engine.stats()?;
    Ok(Json(SnapshotImportResponse {
        status: "imported".to_string(),
        nodes: stats.nodes,
        edges: stats.edges,
    }))
}
