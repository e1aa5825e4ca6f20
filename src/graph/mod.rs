// src/graph/mod.rs

//! Incremental dependency graph.
//!
//! - [`tracker`] holds the forward (`depends`) and reverse (`provides`) edge
//!   maps plus the set of active roots, and reports every structural change
//!   as a [`GraphChanges`] value.
//! - [`resolver`] is the seam through which the graph learns a target's
//!   declared dependencies.
//! - [`cycle`] contains cycle detection used by strict discovery and by the
//!   scheduler's diagnostics for unschedulable sets.

pub mod cycle;
pub mod resolver;
pub mod tracker;

pub use resolver::TargetResolver;
pub use tracker::{DependencyGraph, GraphChanges, GraphEvent};
