use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier. Never reused within a store's lifetime.
pub type NodeId = u64;

/// Stable edge identifier. Never reused within a store's lifetime.
pub type EdgeId = u64;

/// Relationship label used when none is supplied.
pub const DEFAULT_RELATION: &str = "related_to";

/// Edge weight used when none is supplied.
pub const DEFAULT_WEIGHT: f64 = 1.0;

// =============================================================================
// Metadata
// =============================================================================

/// A scalar metadata value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl MetadataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Number(n) => write!(f, "{}", n),
            MetadataValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Number(value as f64)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// Closed key to scalar mapping attached to every node.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// One predicate over a node's metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// Key is present and equal to `value`.
    Eq { key: String, value: MetadataValue },
    /// Key is absent or differs from `value`.
    Ne { key: String, value: MetadataValue },
    /// Key holds a number greater than `value`.
    Gt { key: String, value: f64 },
    Gte { key: String, value: f64 },
    Lt { key: String, value: f64 },
    Lte { key: String, value: f64 },
    /// Key is present with any value.
    Exists { key: String },
}

impl Condition {
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Condition::Eq { key, value } => metadata.get(key) == Some(value),
            Condition::Ne { key, value } => metadata.get(key) != Some(value),
            Condition::Gt { key, value } => numeric(metadata, key).is_some_and(|n| n > *value),
            Condition::Gte { key, value } => numeric(metadata, key).is_some_and(|n| n >= *value),
            Condition::Lt { key, value } => numeric(metadata, key).is_some_and(|n| n < *value),
            Condition::Lte { key, value } => numeric(metadata, key).is_some_and(|n| n <= *value),
            Condition::Exists { key } => metadata.contains_key(key),
        }
    }
}

fn numeric(metadata: &Metadata, key: &str) -> Option<f64> {
    metadata.get(key).and_then(MetadataValue::as_f64)
}

/// Conjunction of metadata conditions. An empty filter matches every node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    #[serde(default)]
    pub all: Vec<Condition>,
}

impl MetadataFilter {
    /// Filter matching nodes whose `key` equals `value`.
    pub fn eq(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::default().and(Condition::Eq {
            key: key.into(),
            value: value.into(),
        })
    }

    /// Builder: add another condition.
    #[must_use]
    pub fn and(mut self, condition: Condition) -> Self {
        self.all.push(condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.all.iter().all(|c| c.matches(metadata))
    }
}

// =============================================================================
// Graph records
// =============================================================================

/// An entity in the store. Its embedding lives in the vector index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A typed, weighted, directed relationship between two nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "type")]
    pub relation: String,
    pub weight: f64,
}

/// Which incident edges a neighbor lookup or traversal follows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Follow edges from source to target.
    Out,
    /// Follow edges from target back to source.
    In,
    /// Treat edges as undirected.
    #[default]
    Both,
}

/// How a reached node's graph proximity is scored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityScoring {
    /// `1 / (1 + hops)`.
    #[default]
    Hop,
    /// `1 / (1 + hops)` scaled by the weight of the discovering edge.
    Weighted,
}

// =============================================================================
// Snapshot
// =============================================================================

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A node together with its embedding, as exported in a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    #[serde(flatten)]
    pub node: Node,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Full export of the store, independent of any storage backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Fixed embedding dimensionality, if one has been established.
    pub dimensions: Option<usize>,
    pub nodes: Vec<SnapshotNode>,
    pub edges: Vec<Edge>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            dimensions: None,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, MetadataValue)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_metadata_value_untagged_json() {
        let m: Metadata =
            serde_json::from_str(r#"{"city": "Paris", "height": 330, "landmark": true}"#).unwrap();
        assert_eq!(m["city"], MetadataValue::String("Paris".into()));
        assert_eq!(m["height"], MetadataValue::Number(330.0));
        assert_eq!(m["landmark"], MetadataValue::Bool(true));
    }

    #[test]
    fn test_filter_eq_and_numeric() {
        let m = meta(&[("type1", "fire".into()), ("generation", 1i64.into())]);

        assert!(MetadataFilter::eq("type1", "fire").matches(&m));
        assert!(!MetadataFilter::eq("type1", "water").matches(&m));
        assert!(!MetadataFilter::eq("missing", "fire").matches(&m));

        let f = MetadataFilter::eq("type1", "fire").and(Condition::Lte {
            key: "generation".into(),
            value: 2.0,
        });
        assert!(f.matches(&m));

        let f = MetadataFilter::default().and(Condition::Gt {
            key: "type1".into(),
            value: 0.0,
        });
        assert!(!f.matches(&m), "numeric comparison on a string never matches");
    }

    #[test]
    fn test_filter_ne_and_exists() {
        let m = meta(&[("lang", "en".into())]);
        let ne = Condition::Ne {
            key: "lang".into(),
            value: "fr".into(),
        };
        assert!(ne.matches(&m));
        assert!(Condition::Exists { key: "lang".into() }.matches(&m));
        assert!(!Condition::Exists { key: "tag".into() }.matches(&m));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(MetadataFilter::default().matches(&Metadata::new()));
    }

    #[test]
    fn test_filter_json_shape() {
        let f: MetadataFilter = serde_json::from_str(
            r#"{"all": [{"op": "eq", "key": "city", "value": "Paris"}, {"op": "exists", "key": "year"}]}"#,
        )
        .unwrap();
        assert_eq!(f.all.len(), 2);
        assert_eq!(
            f.all[0],
            Condition::Eq {
                key: "city".into(),
                value: "Paris".into()
            }
        );
    }

    #[test]
    fn test_edge_serializes_type_field() {
        let e = Edge {
            id: 1,
            source: 1,
            target: 2,
            relation: "located_in".into(),
            weight: 1.0,
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "located_in");
    }

    #[test]
    fn test_direction_default_is_both() {
        assert_eq!(Direction::default(), Direction::Both);
        let d: Direction = serde_json::from_str(r#""out""#).unwrap();
        assert_eq!(d, Direction::Out);
    }
}
