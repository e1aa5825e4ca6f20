// src/backend/mod.rs

//! Concrete build backends, one per [`BuildMode`].
//!
//! - [`cpp`] compiles and archives C++ libraries and links binaries.
//! - [`command`] runs an arbitrary shell command.
//! - [`pkg_config`] and [`process`] are the shared tool plumbing.
//!
//! Backends report every toolchain problem (including tools that cannot be
//! spawned) as [`crate::build::BuildResult::Failure`] values.

pub mod command;
pub mod cpp;
pub mod pkg_config;
pub mod process;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::build::{Builder, WorkerPools};
use crate::config::DaemonConfig;
use crate::fs::FileSystem;
use crate::types::BuildMode;
use crate::watch::registry::compile_globs;

pub use command::CommandBackend;
pub use cpp::{CppBinaryBackend, CppLibraryBackend, CppSettings};
pub use pkg_config::{PkgConfig, PkgFlags};

/// Register the production backends for every mode.
pub fn register_default_backends(
    builder: &mut Builder,
    cfg: &DaemonConfig,
    fs: Arc<dyn FileSystem>,
    pools: Arc<WorkerPools>,
) {
    let settings = Arc::new(CppSettings::from_config(cfg));
    let pkg_config = Arc::new(PkgConfig::new(cfg.toolchain.pkg_config.clone()));

    builder.register_backend(
        BuildMode::CppLibrary,
        Arc::new(CppLibraryBackend::new(
            Arc::clone(&settings),
            fs,
            Arc::clone(&pkg_config),
            pools,
        )),
    );
    builder.register_backend(
        BuildMode::CppBinary,
        Arc::new(CppBinaryBackend::new(settings, pkg_config)),
    );
    builder.register_backend(
        BuildMode::Command,
        Arc::new(CommandBackend::new(cfg.root())),
    );
}

/// Files under `base` whose `base`-relative path matches one of `patterns`,
/// sorted.
///
/// `*` does not cross directory boundaries; use `**` for that.
pub fn expand_sources(fs: &dyn FileSystem, base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    if patterns.is_empty() {
        return Ok(Vec::new());
    }
    let set = compile_globs(patterns)?;

    Ok(fs
        .files_under(base)?
        .into_iter()
        .filter(|path| {
            path.strip_prefix(base)
                .is_ok_and(|rel| set.is_match(rel.to_string_lossy().replace('\\', "/")))
        })
        .collect())
}
