//! Project file discovery.
//!
//! Default implementation of the discovery collaborator: the stream itself
//! only consumes a ready-made file list, so callers with their own project
//! model can skip this module entirely.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{Error, Result};

/// Source extensions the analysis process understands.
const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Dependency directories never walked.
const EXCLUDED_DIRS: &[&str] = &["node_modules"];

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Discover the project's source files under `root`.
///
/// Returns absolute paths in sorted order, honoring gitignore files and
/// skipping dependency directories. An empty result is a configuration
/// error: there would be nothing for the analysis process to check.
pub fn discover_source_files(root: &Path) -> Result<Vec<PathBuf>> {
    let root = root
        .canonicalize()
        .map_err(|e| Error::Discovery(e.into()))?;

    let walker = WalkBuilder::new(&root)
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !EXCLUDED_DIRS.contains(&name))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(Error::Discovery)?;
        if entry.file_type().is_some_and(|t| t.is_file()) && has_source_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(Error::NoSourceFiles);
    }
    tracing::debug!(root = %root.display(), count = files.len(), "discovered source files");
    Ok(files)
}
