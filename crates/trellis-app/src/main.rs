//! Trellis application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the retrieval engine and restore the last snapshot
//! 4. Build the ingest pipeline (embedding provider + relation extractor)
//! 5. Start the axum REST API server

mod cli;

use std::sync::Arc;

use clap::Parser;

use trellis_api::{routes, AppState};
use trellis_core::config::{EmbeddingConfig, EmbeddingProvider, TrellisConfig};
use trellis_core::error::Result;
use trellis_engine::snapshot::{self, SNAPSHOT_FILE};
use trellis_engine::{IngestPipeline, RetrievalEngine};
use trellis_vector::embedding::MOCK_DIMENSIONS;
use trellis_vector::{DynEmbeddingService, MockEmbedding, OllamaEmbedding, PatternExtractor};

use crate::cli::CliArgs;

/// Instantiate the configured embedding provider.
fn build_embedder(config: &EmbeddingConfig) -> Result<Box<dyn DynEmbeddingService>> {
    match config.provider {
        EmbeddingProvider::Mock => {
            let dims = config.dimensions.unwrap_or(MOCK_DIMENSIONS);
            tracing::info!(dimensions = dims, "Using mock embedding provider");
            Ok(Box::new(MockEmbedding::with_dimensions(dims)))
        }
        EmbeddingProvider::Ollama => Ok(Box::new(OllamaEmbedding::new(config)?)),
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Loaded before tracing so its log level can apply; the outcome
    // is logged once the subscriber is up.
    let config_file = args.resolve_config_path();
    let loaded = if config_file.exists() {
        Some(TrellisConfig::load(&config_file))
    } else {
        None
    };
    let mut config = match loaded {
        Some(Ok(ref config)) => config.clone(),
        _ => TrellisConfig::default(),
    };
    config.general.port = args.resolve_port(config.general.port);
    config.general.log_level = args.resolve_log_level(&config.general.log_level);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Trellis v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Some(Ok(_)) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(Err(e)) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config. Using defaults."
        ),
        None => tracing::info!(path = %config_file.display(), "No config file, using defaults"),
    }
    config.validate()?;

    // Engine.
    let engine = Arc::new(match config.embedding.dimensions {
        Some(dims) => RetrievalEngine::with_dimensions(dims),
        None => RetrievalEngine::new(),
    });

    // Snapshot.
    let persist = config.general.persist && !args.ephemeral;
    let snapshot_path = if persist {
        let data_dir = args.resolve_data_dir(&config.general.data_dir);
        if let Err(e) = std::fs::create_dir_all(&data_dir) {
            tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
            return Err(e.into());
        }
        let path = data_dir.join(SNAPSHOT_FILE);
        if !snapshot::load(&engine, &path)? {
            tracing::info!(path = %path.display(), "No snapshot found, starting empty");
        }
        Some(path)
    } else {
        tracing::info!("Persistence disabled, state is in-memory only");
        None
    };

    // Pipeline.
    let embedder = build_embedder(&config.embedding)?;
    let pipeline = IngestPipeline::new_dyn(
        Arc::clone(&engine),
        embedder,
        Box::new(PatternExtractor::new()),
    )
    .with_strip_articles(config.ingest.strip_articles);

    let stats = engine.stats()?;
    tracing::info!(
        nodes = stats.nodes,
        edges = stats.edges,
        embeddings = stats.embeddings,
        "Retrieval engine ready"
    );

    // === API server ===

    let mut state = AppState::new(config, pipeline);
    if let Some(path) = snapshot_path {
        state = state.with_snapshot_path(path);
    }

    let port = state.config.general.port;
    let addr = format!("127.0.0.1:{}", port);
    let router = routes::create_router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind - is another instance running?");
            tracing::error!("Try: trellis --port {}", port.saturating_add(1));
            return Err(e.into());
        }
    };

    tracing::info!(addr = %addr, "API server listening");

    axum::serve(listener, router).await?;

    Ok(())
}
