// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Daemon settings exactly as read from a TOML file.
///
/// ```toml
/// [project]
/// root = "."
/// definition_filename = "BUILD.toml"
///
/// [watch]
/// debounce_ms = 200
///
/// [pools]
/// default_workers = 4
/// source_workers = 8
///
/// [toolchain]
/// compiler = "clang++"
/// ```
///
/// All sections are optional and have reasonable defaults. Use
/// [`DaemonConfig::try_from`] (or the loader) to get a validated config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDaemonConfig {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub pools: PoolsSection,

    #[serde(default)]
    pub graph: GraphSection,

    #[serde(default)]
    pub toolchain: ToolchainSection,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Project root. Relative paths are resolved against the directory that
    /// contains the config file.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Name of the per-directory definition file.
    #[serde(default = "default_definition_filename")]
    pub definition_filename: String,

    /// Archives and linked binaries, relative to `root`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Object files, relative to `root`.
    #[serde(default = "default_object_dir")]
    pub object_dir: PathBuf,

    /// Symlinks for targets with a `binary_name`, relative to `root`.
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_definition_filename() -> String {
    "BUILD.toml".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_object_dir() -> PathBuf {
    PathBuf::from("obj")
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from("bin")
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            definition_filename: default_definition_filename(),
            output_dir: default_output_dir(),
            object_dir: default_object_dir(),
            bin_dir: default_bin_dir(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Debounce window in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Drop events for files whose content hash did not change.
    #[serde(default)]
    pub use_hash: bool,
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            use_hash: false,
        }
    }
}

/// `[pools]` section.
///
/// `wave_workers` and `source_workers` fall back to `default_workers`.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolsSection {
    #[serde(default = "default_workers")]
    pub default_workers: usize,

    #[serde(default)]
    pub wave_workers: Option<usize>,

    #[serde(default)]
    pub source_workers: Option<usize>,
}

fn default_workers() -> usize {
    4
}

impl Default for PoolsSection {
    fn default() -> Self {
        Self {
            default_workers: default_workers(),
            wave_workers: None,
            source_workers: None,
        }
    }
}

impl PoolsSection {
    pub fn effective_wave_workers(&self) -> usize {
        self.wave_workers.unwrap_or(self.default_workers)
    }

    pub fn effective_source_workers(&self) -> usize {
        self.source_workers.unwrap_or(self.default_workers)
    }
}

/// `[graph]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphSection {
    /// Fail dependency discovery on a cycle instead of leaving it to the
    /// scheduler to report the cycle as unschedulable.
    #[serde(default)]
    pub reject_cycles: bool,
}

/// `[toolchain]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolchainSection {
    #[serde(default = "default_compiler")]
    pub compiler: String,

    #[serde(default = "default_archiver")]
    pub archiver: String,

    #[serde(default = "default_pkg_config")]
    pub pkg_config: String,
}

fn default_compiler() -> String {
    "clang++".to_string()
}

fn default_archiver() -> String {
    "ar".to_string()
}

fn default_pkg_config() -> String {
    "pkg-config".to_string()
}

impl Default for ToolchainSection {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            archiver: default_archiver(),
            pkg_config: default_pkg_config(),
        }
    }
}

/// Validated daemon configuration.
///
/// `project.root` is already resolved against the config file's directory.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub project: ProjectSection,
    pub watch: WatchSection,
    pub pools: PoolsSection,
    pub graph: GraphSection,
    pub toolchain: ToolchainSection,
}

impl DaemonConfig {
    /// Build from parts without validation. Only called by the `TryFrom`
    /// implementation in `validate.rs`.
    pub(crate) fn new_unchecked(raw: RawDaemonConfig) -> Self {
        Self {
            project: raw.project,
            watch: raw.watch,
            pools: raw.pools,
            graph: raw.graph,
            toolchain: raw.toolchain,
        }
    }

    /// Default settings for a project rooted at `root`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let mut raw = RawDaemonConfig::default();
        raw.project.root = root.into();
        Self::new_unchecked(raw)
    }

    pub fn root(&self) -> &Path {
        &self.project.root
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.project.root.join(&self.project.output_dir)
    }

    pub fn object_dir(&self) -> PathBuf {
        self.project.root.join(&self.project.object_dir)
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.project.root.join(&self.project.bin_dir)
    }
}
