// src/watch/mod.rs

//! File watch pipeline.
//!
//! Listener (the `notify` callback) → unbounded queue → debounce
//! accumulator thread → optional content-hash filter → registry
//! resolution → modification handlers.
//!
//! - [`registry`] maps changed paths to targets.
//! - [`debounce`] coalesces event bursts into batches.
//! - [`hash`] drops events for files whose content did not change.
//! - [`watcher`] wires it all to the filesystem.

pub mod debounce;
pub mod hash;
pub mod path_utils;
pub mod registry;
pub mod watcher;

pub use registry::{Modifications, WatchRegistry};
pub use watcher::{FileWatchPipeline, ModificationHandler, WatchHandle};
