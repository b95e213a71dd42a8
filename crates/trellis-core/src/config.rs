use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TrellisError};
use crate::types::{Direction, ProximityScoring, DEFAULT_RELATION};

/// Top-level configuration for Trellis.
///
/// Loaded from `~/.trellis/config.toml` by default. Every section falls back
/// to its defaults when missing from the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrellisConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl TrellisConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TrellisConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.general.port == 0 {
            return Err(TrellisError::Config("general.port must be non-zero".into()));
        }
        if !(0.0..=1.0).contains(&self.search.default_alpha) {
            return Err(TrellisError::Config(format!(
                "search.default_alpha must be within [0, 1], got {}",
                self.search.default_alpha
            )));
        }
        if self.search.overfetch_factor == 0 {
            return Err(TrellisError::Config(
                "search.overfetch_factor must be at least 1".into(),
            ));
        }
        if self.embedding.dimensions == Some(0) {
            return Err(TrellisError::Config(
                "embedding.dimensions must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the snapshot file.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP API port.
    pub port: u16,
    /// Write the snapshot after every successful mutation.
    pub persist: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.trellis/data".to_string(),
            log_level: "info".to_string(),
            port: 3040,
            persist: true,
        }
    }
}

/// Which embedding backend the application wires in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    /// Deterministic hash-based vectors. No model required.
    #[default]
    Mock,
    /// Ollama `/api/embeddings` endpoint.
    Ollama,
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    /// Base URL of the provider.
    pub endpoint: String,
    /// Model name passed to the provider.
    pub model: String,
    /// Pinned dimensionality. When unset, the first stored embedding fixes it.
    pub dimensions: Option<usize>,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Mock,
            endpoint: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            dimensions: None,
            timeout_secs: 30,
        }
    }
}

/// Query defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Weight of the vector signal in hybrid ranking.
    pub default_alpha: f64,
    /// BFS depth used when a query does not give one.
    pub default_depth: usize,
    /// Result count used when a query does not give one.
    pub default_k: usize,
    /// Hybrid search fetches `k * overfetch_factor` vector candidates.
    pub overfetch_factor: usize,
    /// Edge direction followed by graph and hybrid queries.
    pub default_direction: Direction,
    /// Graph proximity formula.
    pub proximity: ProximityScoring,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_alpha: 0.7,
            default_depth: 2,
            default_k: 5,
            overfetch_factor: 3,
            default_direction: Direction::Both,
            proximity: ProximityScoring::Hop,
        }
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Relation label for edges created without an explicit type.
    pub default_relation: String,
    /// Ignore a leading "the", "a" or "an" when matching extracted names.
    pub strip_articles: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_relation: DEFAULT_RELATION.to_string(),
            strip_articles: true,
        }
    }
}
