// src/definition/loader.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::DaemonConfig;
use crate::definition::model::{Declaration, DefaultSection, DefinitionFile, Target};
use crate::errors::{Result, WavebuildError};
use crate::fs::FileSystem;
use crate::graph::TargetResolver;
use crate::types::{TargetName, definition_dirs, split_target_name};

/// Source of full target declarations.
pub trait TargetLoader: Send + Sync {
    /// Load the effective declaration of `name`.
    ///
    /// Fails with [`WavebuildError::TargetNotFound`] when no definition file
    /// along the path declares it, and with
    /// [`WavebuildError::InvalidDefinition`] when a file cannot be parsed.
    fn load_target(&self, name: &str) -> Result<Target>;
}

/// Reads layered definition files from the project tree.
#[derive(Debug, Clone)]
pub struct DefinitionLoader {
    root: PathBuf,
    filename: String,
    fs: Arc<dyn FileSystem>,
}

impl DefinitionLoader {
    pub fn new(root: impl Into<PathBuf>, filename: impl Into<String>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            filename: filename.into(),
            fs,
        }
    }

    pub fn from_config(cfg: &DaemonConfig, fs: Arc<dyn FileSystem>) -> Self {
        Self::new(cfg.root(), cfg.project.definition_filename.clone(), fs)
    }

    pub fn definition_filename(&self) -> &str {
        &self.filename
    }

    /// Absolute path of the definition file of a root-relative directory.
    pub fn definition_path(&self, dir: &str) -> PathBuf {
        if dir.is_empty() {
            self.root.join(&self.filename)
        } else {
            self.root.join(dir).join(&self.filename)
        }
    }

    /// Parse the definition file of `dir`, if there is one.
    pub fn read_definition(&self, dir: &str) -> Result<Option<DefinitionFile>> {
        let path = self.definition_path(dir);
        if !self.fs.is_file(&path) {
            trace!(?path, "no definition file");
            return Ok(None);
        }

        let contents = self.fs.read_to_string(&path)?;
        let parsed = toml::from_str::<DefinitionFile>(&contents).map_err(|e| {
            WavebuildError::InvalidDefinition {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(Some(parsed))
    }
}

impl TargetLoader for DefinitionLoader {
    fn load_target(&self, name: &str) -> Result<Target> {
        validate_name(name)?;
        let (_, local) = split_target_name(name);

        let mut defaults = DefaultSection::default();
        let mut declaration: Option<Declaration> = None;

        for dir in definition_dirs(name) {
            let Some(file) = self.read_definition(&dir)? else {
                continue;
            };
            defaults.extend(&file.default);
            if let Some(found) = file.target.get(local) {
                trace!(target = %name, dir = %dir, "declaration found");
                declaration = Some(found.clone());
            }
        }

        let declaration =
            declaration.ok_or_else(|| WavebuildError::TargetNotFound(name.to_string()))?;
        debug!(target = %name, mode = %declaration.mode(), "loaded target");

        Ok(Target::new(name, declaration.with_defaults(&defaults)))
    }
}

impl TargetResolver for DefinitionLoader {
    fn dependencies(&self, name: &str) -> Result<BTreeSet<TargetName>> {
        Ok(self.load_target(name)?.dependency_set())
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if valid {
        Ok(())
    } else {
        Err(WavebuildError::TargetNotFound(format!(
            "{name:?} is not a valid target name"
        )))
    }
}
