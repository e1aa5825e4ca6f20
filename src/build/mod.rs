// src/build/mod.rs

//! Wave-based build scheduling.
//!
//! - [`result`] defines [`BuildResult`]: build failures are values, never
//!   errors, so that wave members and their dependents can be collected and
//!   attributed without aborting unrelated work.
//! - [`context`] is the read-only view a backend gets, plus the
//!   [`BuildBackend`] trait itself.
//! - [`builder`] builds a single target: dependency-failure short-circuit,
//!   backend dispatch by [`crate::types::BuildMode`], start/finish events.
//! - [`tracker`] owns the dirty set and the result cache and runs waves.
//! - [`pools`] holds the named worker pools.

pub mod builder;
pub mod context;
pub mod pools;
pub mod result;
pub mod tracker;

pub use builder::Builder;
pub use context::{BuildBackend, BuildContext, ResultCache, TargetTable};
pub use pools::WorkerPools;
pub use result::{Artifact, BuildFailure, BuildOutcome, BuildResult};
pub use tracker::{BuildSummary, BuildTracker};
