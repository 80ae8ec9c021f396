//! Enumerating candidate images in a dataset directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// List the files in `dir` whose extension matches one of `extensions`.
///
/// Matching is case-insensitive and non-recursive. The result is sorted by
/// path so partitioning is reproducible across runs.
pub fn list_images(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read dataset directory {}", dir.display()))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read entry in {}", dir.display()))?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        if has_extension(&path, extensions) {
            images.push(path);
        }
    }

    images.sort();
    tracing::debug!("Found {} images in {}", images.len(), dir.display());

    Ok(images)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}
