// src/build/builder.rs

//! Single-target builds.
//!
//! The [`Builder`] owns the dispatch table from [`BuildMode`] to backend and
//! the event sink. It is shared by every worker of a wave, so it holds no
//! mutable state.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::build::context::{BuildBackend, BuildContext, ResultCache, TargetTable};
use crate::build::result::{BuildFailure, BuildResult};
use crate::engine::events::{DaemonEvent, EventSink, NullSink};
use crate::types::BuildMode;

pub struct Builder {
    backends: HashMap<BuildMode, Arc<dyn BuildBackend>>,
    sink: Arc<dyn EventSink>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new(Arc::new(NullSink))
    }
}

impl Builder {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            backends: HashMap::new(),
            sink,
        }
    }

    /// Register (or replace) the backend for `mode`.
    pub fn register_backend(&mut self, mode: BuildMode, backend: Arc<dyn BuildBackend>) {
        debug!(%mode, "registering build backend");
        self.backends.insert(mode, backend);
    }

    pub fn with_backend(mut self, mode: BuildMode, backend: Arc<dyn BuildBackend>) -> Self {
        self.register_backend(mode, backend);
        self
    }

    pub fn has_backend(&self, mode: BuildMode) -> bool {
        self.backends.contains_key(&mode)
    }

    /// Build `name` against a wave snapshot, firing start/finish events
    /// around it.
    pub fn build_target(
        &self,
        targets: &TargetTable,
        results: &ResultCache,
        name: &str,
    ) -> Arc<Vec<BuildResult>> {
        self.sink.emit(DaemonEvent::BuildStarted(name.to_string()));

        let built = Arc::new(self.run(targets, results, name));

        self.sink.emit(DaemonEvent::BuildFinished {
            target: name.to_string(),
            results: Arc::clone(&built),
        });
        built
    }

    fn run(&self, targets: &TargetTable, results: &ResultCache, name: &str) -> Vec<BuildResult> {
        let Some(target) = targets.get(name) else {
            return vec![BuildResult::failure(format!(
                "cannot build {name}: target is not loaded"
            ))];
        };

        // A failed or missing dependency fails this target without touching
        // the toolchain.
        let mut causes = Vec::new();
        for dep in target.deps() {
            match results.get(dep) {
                None => causes.push(BuildFailure::new(format!("{dep} has not been built"))),
                Some(dep_results) => {
                    causes.extend(dep_results.iter().filter_map(|r| r.as_failure().cloned()))
                }
            }
        }
        if !causes.is_empty() {
            debug!(target = %name, failed_deps = causes.len(), "skipping build: dependencies failed");
            return vec![BuildResult::Failure(BuildFailure::with_causes(
                format!("cannot build {name}"),
                causes,
            ))];
        }

        let mode = target.mode();
        let Some(backend) = self.backends.get(&mode) else {
            warn!(target = %name, %mode, "no backend registered");
            return vec![BuildResult::failure(format!(
                "cannot build {name}: no backend registered for mode {mode}"
            ))];
        };

        let ctx = BuildContext::new(targets, results, mode);
        match catch_unwind(AssertUnwindSafe(|| backend.build(&ctx, name))) {
            Ok(results) => results,
            Err(panic) => {
                let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    String::from("unknown payload")
                };
                warn!(target = %name, %msg, "build backend panicked");
                vec![BuildResult::failure(format!(
                    "cannot build {name}: backend panicked: {msg}"
                ))]
            }
        }
    }
}
