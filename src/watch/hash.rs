// src/watch/hash.rs

//! Content-hash filter for watch events.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last seen content hash per file.
///
/// Editors and build tools often touch a file without changing it; those
/// events are dropped before they reach the registry.
#[derive(Debug)]
pub struct ContentHashes {
    fs: Arc<dyn FileSystem>,
    hashes: HashMap<PathBuf, String>,
}

impl ContentHashes {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            hashes: HashMap::new(),
        }
    }

    /// Record the current hash of `path` without reporting anything.
    pub fn prime(&mut self, path: &Path) -> Result<()> {
        let hash = compute_file_hash(self.fs.as_ref(), path)?;
        self.hashes.insert(path.to_path_buf(), hash);
        Ok(())
    }

    /// Whether `path` differs from the last time it was seen.
    ///
    /// A file that no longer exists always counts as changed and is
    /// forgotten; a file that cannot be hashed counts as changed.
    pub fn changed(&mut self, path: &Path) -> bool {
        if !self.fs.is_file(path) {
            self.hashes.remove(path);
            return true;
        }

        match compute_file_hash(self.fs.as_ref(), path) {
            Ok(hash) => {
                if self.hashes.get(path) == Some(&hash) {
                    debug!(?path, "content unchanged; dropping event");
                    false
                } else {
                    self.hashes.insert(path.to_path_buf(), hash);
                    true
                }
            }
            Err(err) => {
                debug!(?path, error = %err, "cannot hash file; keeping event");
                true
            }
        }
    }

    /// Keep the paths whose content changed, preserving order.
    pub fn retain_changed(&mut self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        paths.into_iter().filter(|p| self.changed(p)).collect()
    }
}
