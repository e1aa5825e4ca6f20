// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{DaemonConfig, RawDaemonConfig};
use crate::errors::{Result, WavebuildError};

/// Load a settings file from a given path and return the raw model.
///
/// This only performs TOML deserialization; it does **not** validate or
/// resolve the project root. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawDaemonConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawDaemonConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a settings file, resolve `project.root` against the file's directory
/// and validate the result.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<DaemonConfig> {
    let path = path.as_ref();
    let mut raw = load_from_path(path)?;
    raw.project.root = resolve_root(&config_base_dir(path), &raw.project.root);
    DaemonConfig::try_from(raw)
}

/// Like [`load_and_validate`], but a missing file yields default settings
/// rooted at the current directory.
///
/// `explicit` is set when the user named the file on the command line; a
/// missing explicit file is an error rather than a silent fallback.
pub fn load_or_default(path: impl AsRef<Path>, explicit: bool) -> Result<DaemonConfig> {
    let path = path.as_ref();
    if path.exists() {
        return load_and_validate(path);
    }

    if explicit {
        return Err(WavebuildError::ConfigError(format!(
            "config file {:?} does not exist",
            path
        )));
    }

    info!(?path, "no config file found; using default settings");
    let mut raw = RawDaemonConfig::default();
    raw.project.root = resolve_root(&config_base_dir(path), &raw.project.root);
    DaemonConfig::try_from(raw)
}

/// Default settings path: `Wavebuild.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Wavebuild.toml")
}

/// Directory that relative settings are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "configs/Wavebuild.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Wavebuild.toml" (parent = ""),
///   we fall back to the current working directory.
fn config_base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn resolve_root(base: &Path, root: &Path) -> PathBuf {
    let joined = if root.is_absolute() {
        root.to_path_buf()
    } else {
        base.join(root)
    };
    joined.canonicalize().unwrap_or(joined)
}
