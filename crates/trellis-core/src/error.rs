use thiserror::Error;

use crate::types::{EdgeId, NodeId};

/// Top-level error type for the Trellis retrieval engine.
///
/// Every variant carries the offending identifier or value so callers can
/// build their own messages. Transports should branch on [`TrellisError::kind`]
/// rather than on the display string.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrellisError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid edge weight: {0}")]
    InvalidWeight(f64),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse error classification shared by every transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    DimensionMismatch,
    InvalidWeight,
    InvalidArgument,
    CollaboratorFailure,
    Internal,
}

impl TrellisError {
    /// Failure reported by the embedding provider.
    pub fn embedding(message: impl Into<String>) -> Self {
        TrellisError::Collaborator {
            collaborator: "embedding provider",
            message: message.into(),
        }
    }

    /// Failure reported by the relation extractor.
    pub fn extraction(message: impl Into<String>) -> Self {
        TrellisError::Collaborator {
            collaborator: "relation extractor",
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TrellisError::NodeNotFound(_) | TrellisError::EdgeNotFound(_) => ErrorKind::NotFound,
            TrellisError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            TrellisError::InvalidWeight(_) => ErrorKind::InvalidWeight,
            TrellisError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            TrellisError::Collaborator { .. } => ErrorKind::CollaboratorFailure,
            TrellisError::Config(_)
            | TrellisError::Storage(_)
            | TrellisError::Io(_)
            | TrellisError::Serialization(_) => ErrorKind::Internal,
        }
    }
}

impl From<toml::de::Error> for TrellisError {
    fn from(err: toml::de::Error) -> Self {
        TrellisError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TrellisError {
    fn from(err: serde_json::Error) -> Self {
        TrellisError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Trellis operations.
pub type Result<T> = std::result::Result<T, TrellisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let cases: Vec<(TrellisError, &str)> = vec![
            (TrellisError::NodeNotFound(7), "Node not found: 7"),
            (TrellisError::EdgeNotFound(3), "Edge not found: 3"),
            (
                TrellisError::DimensionMismatch {
                    expected: 384,
                    actual: 3,
                },
                "Dimension mismatch: expected 384, got 3",
            ),
            (TrellisError::InvalidWeight(-0.5), "Invalid edge weight: -0.5"),
            (
                TrellisError::InvalidArgument("alpha must be within [0, 1]".into()),
                "Invalid argument: alpha must be within [0, 1]",
            ),
            (
                TrellisError::embedding("connection refused"),
                "embedding provider failed: connection refused",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(TrellisError::NodeNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(TrellisError::EdgeNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(
            TrellisError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
            .kind(),
            ErrorKind::DimensionMismatch
        );
        assert_eq!(TrellisError::InvalidWeight(-1.0).kind(), ErrorKind::InvalidWeight);
        assert_eq!(
            TrellisError::InvalidArgument("k".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            TrellisError::extraction("tagger crashed").kind(),
            ErrorKind::CollaboratorFailure
        );
        assert_eq!(TrellisError::Storage("poisoned".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TrellisError = io_err.into();
        assert!(matches!(err, TrellisError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: TrellisError = err.unwrap_err().into();
        assert!(matches!(err, TrellisError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: TrellisError = err.unwrap_err().into();
        assert!(matches!(err, TrellisError::Serialization(_)));
    }
}
