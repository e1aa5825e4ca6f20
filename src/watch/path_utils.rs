// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again. A deleted file cannot be
///   canonicalized, so its parent is used instead.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slashes(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    if let Ok(path_canon) = path.canonicalize() {
        return path_canon.strip_prefix(&root_canon).ok().map(to_slashes);
    }

    // Gone from disk: resolve the parent and re-attach the file name.
    let parent = path.parent()?.canonicalize().ok()?;
    let name = path.file_name()?;
    parent
        .join(name)
        .strip_prefix(&root_canon)
        .ok()
        .map(to_slashes)
}

fn to_slashes(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

/// Whether `rel` lies inside one of the root-relative directories in
/// `prefixes`.
pub fn is_under_any(rel: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        let prefix = prefix.trim_end_matches('/');
        !prefix.is_empty()
            && (rel == prefix
                || rel
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/')))
    })
}
