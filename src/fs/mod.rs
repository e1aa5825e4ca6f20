// src/fs/mod.rs

//! Read-only view of the project tree.
//!
//! Definition files, source globs and the content-hash filter all go
//! through [`FileSystem`], so the loader and the watch pipeline can be
//! exercised against [`mock::MockFileSystem`]. Build outputs are written by
//! the backends directly; nothing in here writes.

use std::fmt::Debug;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::trace;

pub mod mock;

pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>>;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Full paths of the entries of `dir`, sorted.
    fn read_dir(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Every regular file below `dir`, at any depth, sorted.
    ///
    /// A missing `dir` has no files.
    fn files_under(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if !self.is_dir(dir) {
            return Ok(files);
        }

        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            for path in self.read_dir(&current)? {
                if self.is_dir(&path) {
                    pending.push(path);
                } else if self.is_file(&path) {
                    files.push(path);
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

/// The real disk.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path).with_context(|| format!("opening file {:?}", path))?;
        Ok(Box::new(file))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))? {
            match entry {
                Ok(entry) => entries.push(entry.path()),
                // Editors create and delete temporaries while we list.
                Err(err) => trace!(?dir, error = %err, "skipping vanished entry"),
            }
        }
        entries.sort();
        Ok(entries)
    }
}
