// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Build failures are *not* errors: they are [`crate::build::BuildResult`]
//! values. Everything in here is either a resolution problem (a target whose
//! declaration is missing, malformed or cyclic) or an infrastructure problem
//! (IO, watcher, config).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WavebuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Invalid definition file {path:?}: {message}")]
    InvalidDefinition { path: PathBuf, message: String },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Dependency cycle detected: {0}")]
    DependencyCycle(String),

    #[error("Target is not tracked: {0}")]
    NotTracked(String),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WavebuildError {
    /// Whether this error means "the declaration could not be resolved".
    ///
    /// These are the errors that graph mutations surface to their caller
    /// unchanged; everything else is an infrastructure failure.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            WavebuildError::TargetNotFound(_)
                | WavebuildError::InvalidDefinition { .. }
                | WavebuildError::TomlError(_)
                | WavebuildError::DependencyCycle(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WavebuildError>;
