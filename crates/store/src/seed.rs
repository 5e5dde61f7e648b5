//! Startup seeding from a JSON file.

use rebate_core::{Error, Promotion, Result};
use std::path::Path;
use tracing::info;

/// Read a JSON array of promotions from `path`.
///
/// Nothing is validated here; [`crate::InMemoryStore::insert`] rejects
/// promotions that break the tier invariants.
pub async fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<Promotion>> {
    let path = path.as_ref();
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| Error::store(format!("Failed to read seed file {}: {}", path.display(), e)))?;

    let promotions: Vec<Promotion> = serde_json::from_slice(&raw)?;
    info!(path = %path.display(), count = promotions.len(), "Loaded promotion seed file");
    Ok(promotions)
}
