// src/build/tracker.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::build::builder::Builder;
use crate::build::context::{ResultCache, TargetTable};
use crate::build::pools::WorkerPools;
use crate::build::result::BuildResult;
use crate::definition::Target;
use crate::graph::DependencyGraph;
use crate::graph::cycle::cyclic_components;
use crate::types::TargetName;

/// What one [`BuildTracker::build`] pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub waves: usize,
    /// Targets whose results are all successes.
    pub built: BTreeSet<TargetName>,
    /// Targets with at least one failed result.
    pub failed: BTreeSet<TargetName>,
    /// Dirty targets that could not be ordered and were dropped.
    pub unschedulable: BTreeSet<TargetName>,
}

impl BuildSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.unschedulable.is_empty()
    }
}

/// Dirty set, target table and result cache, plus the wave loop over them.
///
/// Mutated only by its owner (the manager, under its lock). During a wave
/// the workers see the table and the cache as they were when the wave
/// started; results are written back after every member finished.
pub struct BuildTracker {
    targets: TargetTable,
    results: ResultCache,
    modified: BTreeSet<TargetName>,
    builder: Builder,
    pools: Arc<WorkerPools>,
}

impl BuildTracker {
    pub fn new(builder: Builder, pools: Arc<WorkerPools>) -> Self {
        Self {
            targets: TargetTable::new(),
            results: ResultCache::new(),
            modified: BTreeSet::new(),
            builder,
            pools,
        }
    }

    /// Register a freshly tracked target and mark it dirty.
    pub fn add_target(&mut self, target: Arc<Target>) {
        let name = target.name().to_string();
        debug!(target = %name, mode = %target.mode(), "registering target");
        self.targets.insert(name.clone(), target);
        self.mark_dirty(&name);
    }

    /// Forget everything about an untracked target.
    pub fn remove_target(&mut self, name: &str) {
        debug!(target = %name, "unregistering target");
        self.targets.remove(name);
        self.results.remove(name);
        self.modified.remove(name);
    }

    /// Replace the declaration of a refreshed target and mark it dirty.
    pub fn reload_target(&mut self, target: Arc<Target>) {
        self.add_target(target);
    }

    pub fn mark_dirty(&mut self, name: &str) {
        self.modified.insert(name.to_string());
    }

    pub fn dirty(&self) -> &BTreeSet<TargetName> {
        &self.modified
    }

    pub fn target(&self, name: &str) -> Option<&Arc<Target>> {
        self.targets.get(name)
    }

    pub fn targets(&self) -> &TargetTable {
        &self.targets
    }

    pub fn build_result(&self, name: &str) -> Option<Arc<Vec<BuildResult>>> {
        self.results.get(name).cloned()
    }

    /// Drain the dirty set in waves.
    ///
    /// A wave is every dirty target none of whose direct dependencies is
    /// still dirty. When no such target exists while the dirty set is not
    /// empty, the remainder cannot be ordered: it is logged, its cached
    /// results are dropped and the pass ends.
    pub fn build(&mut self, graph: &DependencyGraph) -> BuildSummary {
        let mut summary = BuildSummary::default();

        while !self.modified.is_empty() {
            let ready: Vec<TargetName> = self
                .modified
                .iter()
                .filter(|name| {
                    graph
                        .dependencies(name)
                        .is_none_or(|deps| deps.iter().all(|d| !self.modified.contains(d)))
                })
                .cloned()
                .collect();

            if ready.is_empty() {
                let components = cyclic_components(&self.modified, |n| graph.dependencies(n));
                warn!(
                    stuck = ?self.modified,
                    cycles = ?components,
                    "no progress possible; dropping unschedulable targets"
                );
                for name in &self.modified {
                    self.results.remove(name);
                }
                summary.unschedulable = std::mem::take(&mut self.modified);
                break;
            }

            summary.waves += 1;
            info!(wave = summary.waves, targets = ready.len(), "starting wave");
            debug!(wave = summary.waves, ?ready, "wave members");

            let targets = &self.targets;
            let results = &self.results;
            let builder = &self.builder;
            let finished: Vec<(TargetName, Arc<Vec<BuildResult>>)> = self.pools.wave().install(|| {
                ready
                    .par_iter()
                    .map(|name| (name.clone(), builder.build_target(targets, results, name)))
                    .collect()
            });

            for (name, built) in finished {
                if built.iter().all(BuildResult::ok) {
                    debug!(target = %name, "build succeeded");
                    summary.failed.remove(&name);
                    summary.built.insert(name.clone());
                } else {
                    warn!(target = %name, "build failed");
                    summary.built.remove(&name);
                    summary.failed.insert(name.clone());
                }
                self.modified.remove(&name);
                self.results.insert(name, built);
            }
        }

        summary
    }
}
