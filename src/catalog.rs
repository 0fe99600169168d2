//! Catalog input: a JSON array of entries from the acquisition step.

use anyhow::{Context, Result};
use std::path::Path;

use crate::models::CatalogEntry;

/// Read the catalog. An unreadable catalog is the one input failure that
/// stops a run.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse catalog: {:?}", path))
}
