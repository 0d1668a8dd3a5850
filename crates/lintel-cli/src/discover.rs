//! Source discovery and parsing.

use lintel_core::{Notification, SyntaxTree};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Walks `root` honoring `.gitignore` and returns the `.rs` files, sorted.
///
/// A file given as `root` is returned as is.
///
/// # Errors
///
/// Returns an error if the directory walk fails.
pub fn rust_files(root: &Path) -> Result<Vec<PathBuf>, ignore::Error> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut builder = ignore::WalkBuilder::new(root);
    builder.hidden(false).git_ignore(true).require_git(false);

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    debug!("Discovered {} source files under {}", files.len(), root.display());
    Ok(files)
}

/// Parses `files` in parallel; unparsable files become error notifications.
#[must_use]
pub fn parse_all(files: &[PathBuf]) -> (Vec<SyntaxTree>, Vec<Notification>) {
    let parsed: Vec<_> = files.par_iter().map(|p| lintel_syn::parse_path(p)).collect();

    let mut trees = Vec::with_capacity(parsed.len());
    let mut notifications = Vec::new();
    for result in parsed {
        match result {
            Ok(tree) => trees.push(tree),
            Err(e) => {
                warn!("Skipping file: {e}");
                notifications.push(Notification::error(e.to_string()));
            }
        }
    }
    (trees, notifications)
}
