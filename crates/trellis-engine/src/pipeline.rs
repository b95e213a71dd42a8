//! Ingestion: text in, node + embedding + extracted edges out.
//!
//! The embedding and extraction services are awaited before the store lock is
//! taken. If either fails, nothing is written. The node, its embedding and the
//! resolved edges are then committed under a single write lock.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use trellis_core::error::{Result, TrellisError};
use trellis_core::types::{Edge, Metadata, Node, NodeId, DEFAULT_WEIGHT};
use trellis_graph::{GraphStore, NodeUpdate};
use trellis_vector::{
    normalize_name, DynEmbeddingService, DynRelationExtractor, EmbeddingService,
    RelationExtractor, Triple,
};

use crate::engine::{NodeEntry, RetrievalEngine};

/// Result of a successful ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    /// The node as committed.
    pub node: Node,
    /// Edges created from resolved triples, in creation order.
    pub edges: Vec<Edge>,
    /// Triples whose subject or object matched no node.
    pub unresolved: usize,
}

/// Coordinates embedding, extraction and the atomic commit.
pub struct IngestPipeline {
    engine: Arc<RetrievalEngine>,
    embedder: Box<dyn DynEmbeddingService>,
    extractor: Box<dyn DynRelationExtractor>,
    strip_articles: bool,
}

impl IngestPipeline {
    pub fn new<E, X>(engine: Arc<RetrievalEngine>, embedder: E, extractor: X) -> Self
    where
        E: EmbeddingService + 'static,
        X: RelationExtractor + 'static,
    {
        Self::new_dyn(engine, Box::new(embedder), Box::new(extractor))
    }

    pub fn new_dyn(
        engine: Arc<RetrievalEngine>,
        embedder: Box<dyn DynEmbeddingService>,
        extractor: Box<dyn DynRelationExtractor>,
    ) -> Self {
        Self {
            engine,
            embedder,
            extractor,
            strip_articles: true,
        }
    }

    /// Whether a leading article is ignored when matching names.
    pub fn with_strip_articles(mut self, strip_articles: bool) -> Self {
        self.strip_articles = strip_articles;
        self
    }

    pub fn engine(&self) -> &Arc<RetrievalEngine> {
        &self.engine
    }

    /// Embed free text for use as a query vector.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(TrellisError::InvalidArgument(
                "query text must not be empty".to_string(),
            ));
        }
        self.embed(text).await
    }

    /// Ingest `text` as a new node named `name`.
    ///
    /// Triples whose endpoints resolve to existing node names (or to the new
    /// node) become edges. Unresolved triples are dropped. Ingesting the same
    /// text twice creates two nodes.
    pub async fn ingest(&self, text: &str, name: &str, metadata: Metadata) -> Result<IngestOutcome> {
        if name.trim().is_empty() {
            return Err(TrellisError::InvalidArgument(
                "node name must not be empty".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(TrellisError::InvalidArgument(
                "node text must not be empty".to_string(),
            ));
        }

        debug!(name, chars = text.len(), "Ingesting text");
        let embedding = self.embed(text).await?;
        let triples = self
            .extractor
            .extract_boxed(text)
            .await
            .map_err(|e| as_collaborator(e, TrellisError::extraction))?;
        debug!(triples = triples.len(), "Extraction complete");

        let mut store = self.engine.write()?;
        store.vectors.check_vector(&embedding)?;

        let node_id = store
            .graph
            .create_node(name.to_string(), text.to_string(), metadata);
        store.vectors.set_embedding(node_id, embedding)?;

        let names = NameIndex::build(&store.graph, node_id, self.strip_articles);
        let mut edges = Vec::new();
        let mut unresolved = 0;
        for triple in &triples {
            let Some((source, target)) = names.resolve(triple) else {
                debug!(
                    subject = %triple.subject,
                    relation = %triple.relation,
                    object = %triple.object,
                    "Dropping unresolved triple"
                );
                unresolved += 1;
                continue;
            };
            let created = store
                .graph
                .create_edge(source, target, triple.relation.clone(), DEFAULT_WEIGHT)
                .and_then(|id| store.graph.get_edge(id).cloned());
            match created {
                Ok(edge) => edges.push(edge),
                Err(e) => {
                    // Roll back so the ingest stays all-or-nothing.
                    store.graph.delete_node(node_id)?;
                    store.vectors.remove_embedding(node_id);
                    return Err(e);
                }
            }
        }

        let node = store.graph.get_node(node_id)?.clone();
        info!(
            node_id,
            edges = edges.len(),
            unresolved,
            "Ingested node"
        );
        Ok(IngestOutcome {
            node,
            edges,
            unresolved,
        })
    }

    /// Update a node, re-embedding it when its text changes.
    ///
    /// The embedding service is called before any change is made; on failure
    /// the node keeps its old text and embedding.
    pub async fn update_node(&self, id: NodeId, update: NodeUpdate) -> Result<NodeEntry> {
        let current = self.engine.get_node(id)?;
        let embedding = match update.text.as_deref() {
            Some(text) if text != current.text => Some(self.embed(text).await?),
            _ => None,
        };
        self.engine.update_node_with_embedding(id, update, embedding)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self
            .embedder
            .embed_boxed(text)
            .await
            .map_err(|e| as_collaborator(e, TrellisError::embedding))?;
        if embedding.is_empty() || embedding.iter().any(|v| !v.is_finite()) {
            return Err(TrellisError::embedding(
                "provider returned an empty or non-finite vector",
            ));
        }
        Ok(embedding)
    }
}

/// Wrap a service error as a collaborator failure unless it already is one.
fn as_collaborator(err: TrellisError, wrap: fn(String) -> TrellisError) -> TrellisError {
    warn!(error = %err, "Collaborator call failed");
    match err {
        e @ TrellisError::Collaborator { .. } => e,
        other => wrap(other.to_string()),
    }
}

/// Normalized node names mapped to the node that wins a match.
struct NameIndex {
    by_name: HashMap<String, NodeId>,
    strip_articles: bool,
}

impl NameIndex {
    /// Lowest id wins among existing nodes; the fresh node wins over all.
    fn build(graph: &GraphStore, fresh: NodeId, strip_articles: bool) -> Self {
        let mut by_name = HashMap::new();
        for node in graph.nodes() {
            by_name
                .entry(normalize_name(&node.name, strip_articles))
                .or_insert(node.id);
        }
        if let Ok(node) = graph.get_node(fresh) {
            by_name.insert(normalize_name(&node.name, strip_articles), fresh);
        }
        by_name.remove("");
        Self {
            by_name,
            strip_articles,
        }
    }

    fn lookup(&self, name: &str) -> Option<NodeId> {
        self.by_name
            .get(&normalize_name(name, self.strip_articles))
            .copied()
    }

    /// Both endpoints, or `None` if either is unknown or they coincide.
    fn resolve(&self, triple: &Triple) -> Option<(NodeId, NodeId)> {
        let source = self.lookup(&triple.subject)?;
        let target = self.lookup(&triple.object)?;
        (source != target).then_some((source, target))
    }
}
