//! Safety checks on the dataset path before a run rewrites it.
//!
//! The store rewrites its file on every append, so pointing it at the
//! catalog input (or some other non-dataset file) would destroy that file.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that the dataset path is safe to rewrite.
///
/// Checks:
/// - The dataset file must have a `.json` extension
/// - The dataset cannot be the catalog input
/// - An existing dataset path must be a regular file
pub fn validate_dataset_path(dataset: &Path, catalog: &Path) -> Result<()> {
    let is_json = dataset
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if !is_json {
        bail!(
            "Safety check failed: dataset file '{}' must have a .json extension",
            dataset.display()
        );
    }

    if same_file(dataset, catalog) {
        bail!(
            "Safety check failed: dataset '{}' cannot be the same as catalog '{}'",
            dataset.display(),
            catalog.display()
        );
    }

    if dataset.exists() && !dataset.is_file() {
        bail!(
            "Safety check failed: dataset '{}' exists and is not a regular file",
            dataset.display()
        );
    }

    Ok(())
}

/// Path equality, resolving symlinks and relative segments when both exist.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
