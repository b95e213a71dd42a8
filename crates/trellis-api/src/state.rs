//! Application state shared across all route handlers.
//!
//! AppState holds references to the engine, the ingest pipeline and the
//! configuration. It is passed to handlers via axum's State extractor.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::warn;

use trellis_core::config::TrellisConfig;
use trellis_engine::{snapshot, IngestPipeline, RetrievalEngine};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (read-only at runtime).
    pub config: Arc<TrellisConfig>,
    /// Graph store + vector index behind one lock.
    pub engine: Arc<RetrievalEngine>,
    /// Embedding + extraction pipeline sharing `engine`.
    pub pipeline: Arc<IngestPipeline>,
    /// Where to write the snapshot after each mutation, if persistence is on.
    pub snapshot_path: Option<PathBuf>,
    /// Serializes snapshot writes.
    persist_lock: Arc<Mutex<()>>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState. The pipeline must wrap the same engine.
    pub fn new(config: TrellisConfig, pipeline: IngestPipeline) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::clone(pipeline.engine()),
            pipeline: Arc::new(pipeline),
            snapshot_path: None,
            persist_lock: Arc::new(Mutex::new(())),
            start_time: Instant::now(),
        }
    }

    /// Write a snapshot to `path` after every successful mutation.
    pub fn with_snapshot_path(mut self, path: PathBuf) -> Self {
        self.snapshot_path = Some(path);
        self
    }

    /// Save the current state if persistence is enabled.
    ///
    /// A failed save is logged and does not fail the request; the in-memory
    /// mutation has already been applied.
    pub fn persist(&self) {
        let Some(path) = self.snapshot_path.as_deref() else {
            return;
        };
        let _guard = match self.persist_lock.lock() {
            Ok(guard) => guard,
            Err(e) => {
                warn!("Persist lock poisoned: {}", e);
                return;
            }
        };
        if let Err(e) = snapshot::save(&self.engine, path) {
            warn!(error = %e, "Failed to save snapshot to {}", path.display());
        }
    }
}
