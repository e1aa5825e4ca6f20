// src/definition/mod.rs

//! Target declarations.
//!
//! Every directory of the project may hold a definition file (`BUILD.toml`
//! by default) with tagged target records. This is a plain data format: the
//! loader parses it, layers it along the target's path and hands out
//! immutable [`Target`] values.
//!
//! - [`model`] is the serde data model and the [`Target`] type.
//! - [`loader`] reads and layers definition files ([`DefinitionLoader`]).

pub mod loader;
pub mod model;

pub use loader::{DefinitionLoader, TargetLoader};
pub use model::{
    CommandDecl, CppBinaryDecl, CppLibraryDecl, Declaration, DefaultSection, DefinitionFile,
    Target,
};
