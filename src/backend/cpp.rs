// src/backend/cpp.rs

//! C++ static libraries and binaries.
//!
//! A library compiles each source into
//! `<object_dir>/<dir>/<name>/<source path under dir>.o` on the `sources`
//! pool and archives them into `<output_dir>/<dir>/lib<name>.a`. Object paths
//! are unique per target and per source, so co-wave builds never share one.
//! A binary links the archives of all of its transitive dependencies into
//! `<output_dir>/<name>`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::backend::expand_sources;
use crate::backend::pkg_config::{PkgConfig, PkgFlags};
use crate::backend::process::{run_process, spawn_failure};
use crate::build::{Artifact, BuildBackend, BuildContext, BuildFailure, BuildResult, WorkerPools};
use crate::config::DaemonConfig;
use crate::definition::{CppBinaryDecl, CppLibraryDecl, Declaration, Target};
use crate::fs::FileSystem;

/// Toolchain and layout settings shared by both C++ backends.
#[derive(Debug, Clone)]
pub struct CppSettings {
    pub root: PathBuf,
    pub object_dir: PathBuf,
    pub output_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub compiler: String,
    pub archiver: String,
}

impl CppSettings {
    pub fn from_config(cfg: &DaemonConfig) -> Self {
        Self {
            root: cfg.root().to_path_buf(),
            object_dir: cfg.object_dir(),
            output_dir: cfg.output_dir(),
            bin_dir: cfg.bin_dir(),
            compiler: cfg.toolchain.compiler.clone(),
            archiver: cfg.toolchain.archiver.clone(),
        }
    }
}

fn cannot_build(name: &str, causes: Vec<BuildFailure>) -> Vec<BuildResult> {
    vec![BuildResult::Failure(BuildFailure::with_causes(
        format!("cannot build {name}"),
        causes,
    ))]
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
    }
    Ok(())
}

pub struct CppLibraryBackend {
    settings: Arc<CppSettings>,
    fs: Arc<dyn FileSystem>,
    pkg_config: Arc<PkgConfig>,
    pools: Arc<WorkerPools>,
}

impl CppLibraryBackend {
    pub fn new(
        settings: Arc<CppSettings>,
        fs: Arc<dyn FileSystem>,
        pkg_config: Arc<PkgConfig>,
        pools: Arc<WorkerPools>,
    ) -> Self {
        Self {
            settings,
            fs,
            pkg_config,
            pools,
        }
    }

    /// Source files of `target`: the declared globs, or `<name>.cc`.
    pub fn sources(&self, target: &Target, decl: &CppLibraryDecl) -> Result<Vec<PathBuf>> {
        let base = self.settings.root.join(target.dir());
        match &decl.sources {
            Some(patterns) => expand_sources(self.fs.as_ref(), &base, patterns),
            None => {
                let conventional = base.join(format!("{}.cc", target.local_name()));
                debug!(target = %target.name(), ?conventional, "no sources declared; using convention");
                Ok(if self.fs.is_file(&conventional) {
                    vec![conventional]
                } else {
                    Vec::new()
                })
            }
        }
    }

    /// Object file for `source`, mirroring its path below the target
    /// directory `base` inside the target's object directory.
    pub fn object_path(obj_dir: &Path, base: &Path, source: &Path) -> PathBuf {
        let rel = source
            .strip_prefix(base)
            .ok()
            .or_else(|| source.file_name().map(Path::new))
            .unwrap_or(source);
        let mut object = obj_dir.join(rel).into_os_string();
        object.push(".o");
        PathBuf::from(object)
    }

    fn compile(&self, source: &Path, cflags: &[String], base: &Path, obj_dir: &Path) -> Result<PathBuf, BuildFailure> {
        let object = Self::object_path(obj_dir, base, source);
        if let Err(err) = create_parent(&object) {
            return Err(BuildFailure::new(format!("{err:#}")));
        }

        let mut args: Vec<String> = cflags.to_vec();
        args.push("-I".to_string());
        args.push(self.settings.root.to_string_lossy().into_owned());
        args.push("-c".to_string());
        args.push(source.to_string_lossy().into_owned());
        args.push("-o".to_string());
        args.push(object.to_string_lossy().into_owned());

        match run_process(&self.settings.compiler, &args, None) {
            Ok(out) if out.success => Ok(object),
            Ok(out) => Err(out.failure(&format!("compiling {}", source.display()))),
            Err(err) => Err(BuildFailure::new(format!("{err:#}"))),
        }
    }

    fn archive(&self, target: &Target, objects: &[PathBuf]) -> Result<PathBuf, BuildFailure> {
        let archive = self
            .settings
            .output_dir
            .join(target.dir())
            .join(format!("lib{}.a", target.local_name()));

        let prepare = create_parent(&archive).and_then(|()| {
            if archive.exists() {
                fs::remove_file(&archive).with_context(|| format!("removing {:?}", archive))?;
            }
            Ok(())
        });
        if let Err(err) = prepare {
            return Err(BuildFailure::new(format!("{err:#}")));
        }

        let mut args = vec!["rc".to_string(), archive.to_string_lossy().into_owned()];
        args.extend(objects.iter().map(|o| o.to_string_lossy().into_owned()));

        match run_process(&self.settings.archiver, &args, None) {
            Ok(out) if out.success => Ok(archive),
            Ok(out) => Err(out.failure(&format!("archiving {}", archive.display()))),
            Err(err) => Err(BuildFailure::new(format!("{err:#}"))),
        }
    }
}

impl BuildBackend for CppLibraryBackend {
    fn build(&self, ctx: &BuildContext<'_>, name: &str) -> Vec<BuildResult> {
        let Some(target) = ctx.target(name) else {
            return vec![BuildResult::failure(format!("cannot build {name}: target is not loaded"))];
        };
        let Declaration::CppLibrary(decl) = target.declaration() else {
            return vec![BuildResult::failure(format!(
                "cannot build {name}: not a cpp_library target"
            ))];
        };

        let sources = match self.sources(target, decl) {
            Ok(sources) => sources,
            Err(err) => return vec![spawn_failure(name, &err)],
        };
        if sources.is_empty() {
            info!(target = %name, "no sources; nothing to build");
            return Vec::new();
        }
        debug!(target = %name, ?sources, "compiling sources");

        let base = self.settings.root.join(target.dir());
        let obj_dir = self
            .settings
            .object_dir
            .join(target.dir())
            .join(target.local_name());

        let mut cflags = decl.cflags.clone();
        cflags.extend(self.pkg_config.flags(&decl.pkg_config, PkgFlags::Cflags));

        let compiled: Vec<Result<PathBuf, BuildFailure>> = self.pools.sources().install(|| {
            sources
                .par_iter()
                .map(|source| self.compile(source, &cflags, &base, &obj_dir))
                .collect()
        });

        let mut objects = Vec::with_capacity(compiled.len());
        let mut errors = Vec::new();
        for result in compiled {
            match result {
                Ok(object) => objects.push(object),
                Err(failure) => errors.push(failure),
            }
        }
        if !errors.is_empty() {
            warn!(target = %name, errors = errors.len(), "compilation failed");
            return cannot_build(name, errors);
        }

        match self.archive(target, &objects) {
            Ok(archive) => vec![BuildResult::Success(Artifact::StaticLibrary {
                archive,
                lflags: decl.lflags.clone(),
                pkg_deps: decl.pkg_config.iter().cloned().collect(),
            })],
            Err(failure) => cannot_build(name, vec![failure]),
        }
    }
}

pub struct CppBinaryBackend {
    settings: Arc<CppSettings>,
    pkg_config: Arc<PkgConfig>,
}

impl CppBinaryBackend {
    pub fn new(settings: Arc<CppSettings>, pkg_config: Arc<PkgConfig>) -> Self {
        Self {
            settings,
            pkg_config,
        }
    }

    fn link_args(&self, ctx: &BuildContext<'_>, name: &str, decl: &CppBinaryDecl, output: &Path) -> Result<Vec<String>, Vec<BuildFailure>> {
        let mut causes = Vec::new();
        let mut args = Vec::new();
        let mut pkg_deps: BTreeSet<String> = decl.pkg_config.iter().cloned().collect();

        for dep in ctx.transitive_dependencies(name) {
            let Some(results) = ctx.results(&dep) else {
                causes.push(BuildFailure::new(format!("{dep} has not been built")));
                continue;
            };
            for result in results {
                match result {
                    BuildResult::Failure(failure) => causes.push(failure.clone()),
                    BuildResult::Success(Artifact::StaticLibrary {
                        archive,
                        lflags,
                        pkg_deps: deps,
                    }) => {
                        args.push(archive.to_string_lossy().into_owned());
                        args.extend(lflags.iter().cloned());
                        pkg_deps.extend(deps.iter().cloned());
                    }
                    BuildResult::Success(_) => {}
                }
            }
        }
        if !causes.is_empty() {
            return Err(causes);
        }

        args.extend(decl.lflags.iter().cloned());
        args.extend(self.pkg_config.flags(&pkg_deps, PkgFlags::Libs));
        args.push("-o".to_string());
        args.push(output.to_string_lossy().into_owned());
        Ok(args)
    }

    fn symlink(&self, binary: &Path, link_name: &str) -> Result<()> {
        let link = self.settings.bin_dir.join(link_name);
        info!(?binary, ?link, "symlinking binary");
        create_parent(&link)?;
        if link.symlink_metadata().is_ok() {
            fs::remove_file(&link).with_context(|| format!("removing {:?}", link))?;
        }
        #[cfg(unix)]
        std::os::unix::fs::symlink(binary, &link)
            .with_context(|| format!("symlinking {:?} to {:?}", binary, link))?;
        #[cfg(not(unix))]
        fs::copy(binary, &link).with_context(|| format!("copying {:?} to {:?}", binary, link))?;
        Ok(())
    }
}

impl BuildBackend for CppBinaryBackend {
    fn build(&self, ctx: &BuildContext<'_>, name: &str) -> Vec<BuildResult> {
        let Some(target) = ctx.target(name) else {
            return vec![BuildResult::failure(format!("cannot build {name}: target is not loaded"))];
        };
        let Declaration::CppBinary(decl) = target.declaration() else {
            return vec![BuildResult::failure(format!(
                "cannot build {name}: not a cpp_binary target"
            ))];
        };

        let output = self.settings.output_dir.join(name);
        let args = match self.link_args(ctx, name, decl, &output) {
            Ok(args) => args,
            Err(causes) => return cannot_build(name, causes),
        };
        if let Err(err) = create_parent(&output) {
            return vec![spawn_failure(name, &err)];
        }

        match run_process(&self.settings.compiler, &args, None) {
            Ok(out) if out.success => {}
            Ok(out) => return cannot_build(name, vec![out.failure(&format!("linking {}", output.display()))]),
            Err(err) => return vec![spawn_failure(name, &err)],
        }

        if let Some(link_name) = &decl.binary_name
            && let Err(err) = self.symlink(&output, link_name)
        {
            return vec![spawn_failure(name, &err)];
        }

        vec![BuildResult::Success(Artifact::Executable { path: output })]
    }
}
