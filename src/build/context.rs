// src/build/context.rs

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::build::result::BuildResult;
use crate::definition::Target;
use crate::types::{BuildMode, TargetName};

/// Every loaded target, keyed by name.
pub type TargetTable = HashMap<TargetName, Arc<Target>>;

/// Last results per target. Overwritten whenever the target is rebuilt.
pub type ResultCache = HashMap<TargetName, Arc<Vec<BuildResult>>>;

/// Read-only view handed to a backend for one single-target build.
///
/// Both maps are the snapshot taken when the current wave started; results
/// produced by other members of the same wave are not visible.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    targets: &'a TargetTable,
    results: &'a ResultCache,
    mode: BuildMode,
}

impl<'a> BuildContext<'a> {
    pub fn new(targets: &'a TargetTable, results: &'a ResultCache, mode: BuildMode) -> Self {
        Self {
            targets,
            results,
            mode,
        }
    }

    pub fn target(&self, name: &str) -> Option<&'a Arc<Target>> {
        self.targets.get(name)
    }

    pub fn targets(&self) -> &'a TargetTable {
        self.targets
    }

    /// Cached results of `name`, if it was ever built.
    pub fn results(&self, name: &str) -> Option<&'a [BuildResult]> {
        self.results.get(name).map(|r| r.as_slice())
    }

    /// Mode of the target being built.
    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Transitive dependencies of `name` in pre-order, each kept at its last
    /// occurrence, so every dependent precedes its dependencies.
    ///
    /// Names with no loaded target are still listed (they will have no
    /// results either) but are not descended into.
    pub fn transitive_dependencies(&self, name: &str) -> Vec<TargetName> {
        let mut order = Vec::new();
        let mut visiting = BTreeSet::new();
        self.walk(name, &mut order, &mut visiting);

        let mut seen = BTreeSet::new();
        let mut deduped: Vec<TargetName> = order
            .into_iter()
            .rev()
            .filter(|n| seen.insert(n.clone()))
            .collect();
        deduped.reverse();
        deduped
    }

    fn walk(&self, name: &str, order: &mut Vec<TargetName>, visiting: &mut BTreeSet<TargetName>) {
        let Some(target) = self.targets.get(name) else {
            return;
        };
        if !visiting.insert(name.to_string()) {
            return;
        }
        for dep in target.deps() {
            order.push(dep.clone());
            self.walk(dep, order, visiting);
        }
        visiting.remove(name);
    }
}

/// A build backend for one [`BuildMode`].
///
/// Backends run concurrently on the wave pool, so they must not keep
/// per-build mutable state outside of what they return. Ordinary build
/// failures are returned as [`BuildResult::Failure`] values.
pub trait BuildBackend: Send + Sync {
    fn build(&self, ctx: &BuildContext<'_>, name: &str) -> Vec<BuildResult>;
}
