//! JSON snapshot files.
//!
//! A snapshot is written to a sibling temp file and renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use std::path::Path;

use tracing::info;

use trellis_core::error::Result;
use trellis_core::types::Snapshot;

use crate::engine::RetrievalEngine;

/// File name used inside the data directory.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_vec_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let content = std::fs::read(path)?;
    Ok(serde_json::from_slice(&content)?)
}

/// Export the engine state to `path`.
pub fn save(engine: &RetrievalEngine, path: &Path) -> Result<()> {
    let snapshot = engine.export_snapshot()?;
    write_snapshot(path, &snapshot)?;
    info!(
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        "Snapshot saved to {}",
        path.display()
    );
    Ok(())
}

/// Replace the engine state with the snapshot at `path`.
///
/// Returns `false` without touching the engine if the file does not exist.
pub fn load(engine: &RetrievalEngine, path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    engine.import_snapshot(read_snapshot(path)?)?;
    info!("Snapshot loaded from {}", path.display());
    Ok(true)
}
