// src/config/mod.rs

//! Daemon configuration.
//!
//! Responsibilities:
//! - Define the TOML-backed settings model (`model.rs`).
//! - Load a settings file from disk, falling back to defaults (`loader.rs`).
//! - Validate basic invariants like worker counts (`validate.rs`).
//!
//! Target declarations (`BUILD.toml`) are *not* configuration; they live in
//! [`crate::definition`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    DaemonConfig, GraphSection, PoolsSection, ProjectSection, RawDaemonConfig, ToolchainSection,
    WatchSection,
};
