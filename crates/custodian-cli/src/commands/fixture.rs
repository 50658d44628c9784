//! Policy fixtures: TOML snapshots loaded into an in-memory store.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use custodian_store::{MemoryStore, StoreSnapshot};

/// Reads `path` and seeds a [`MemoryStore`] with it.
pub fn load(path: &Path) -> Result<MemoryStore> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let snapshot: StoreSnapshot = toml::from_str(&content)
        .with_context(|| format!("Failed to parse fixture {}", path.display()))?;

    tracing::debug!(
        fixture = %path.display(),
        actors = snapshot.actors.len(),
        resources = snapshot.resources.len(),
        rules = snapshot.rules.len(),
        "Fixture loaded"
    );
    Ok(MemoryStore::from_snapshot(snapshot))
}
