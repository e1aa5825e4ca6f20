// src/engine/mod.rs

//! Orchestration engine for wavebuild.
//!
//! This module ties together:
//! - the dependency graph (what is tracked)
//! - the build tracker (what is dirty, what was built)
//! - the watch registry (which files belong to which target)
//!
//! The [`Manager`] is the single serialization point; [`events`] defines the
//! lifecycle notifications it and the scheduler emit.

pub mod events;
pub mod manager;
pub mod session;

pub use events::{DaemonEvent, EventSink, NullSink};
pub use manager::Manager;
pub use session::Session;
