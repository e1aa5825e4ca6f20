// src/graph/tracker.rs

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use tracing::{debug, info, trace};

use crate::errors::{Result, WavebuildError};
use crate::graph::cycle::find_cycle_from;
use crate::graph::resolver::TargetResolver;
use crate::types::TargetName;

/// A single structural notification produced by a graph mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    /// The name became reachable and now has a `depends` entry.
    Tracked(TargetName),
    /// The name is no longer reachable from any active root.
    Untracked(TargetName),
    /// The name, or something it transitively depends on, was re-resolved;
    /// cached artifacts for it are stale.
    Refreshed(TargetName),
}

/// Net effect of one graph mutation.
///
/// Names that were both inserted and removed within the same call appear in
/// neither set, so a name never receives a spurious Tracked+Untracked pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphChanges {
    pub tracked: BTreeSet<TargetName>,
    pub untracked: BTreeSet<TargetName>,
    pub refreshed: BTreeSet<TargetName>,
}

impl GraphChanges {
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty() && self.untracked.is_empty() && self.refreshed.is_empty()
    }

    /// Events in delivery order: every Tracked, then every Untracked, then
    /// every Refreshed.
    pub fn events(&self) -> Vec<GraphEvent> {
        let tracked = self.tracked.iter().cloned().map(GraphEvent::Tracked);
        let untracked = self.untracked.iter().cloned().map(GraphEvent::Untracked);
        let refreshed = self.refreshed.iter().cloned().map(GraphEvent::Refreshed);
        tracked.chain(untracked).chain(refreshed).collect()
    }
}

/// Raw insertions/removals recorded during one mutation.
#[derive(Debug, Default)]
struct Recording {
    added: BTreeSet<TargetName>,
    removed: BTreeSet<TargetName>,
}

impl Recording {
    fn finish(self) -> GraphChanges {
        let tracked = self.added.difference(&self.removed).cloned().collect();
        let untracked = self.removed.difference(&self.added).cloned().collect();
        GraphChanges {
            tracked,
            untracked,
            refreshed: BTreeSet::new(),
        }
    }
}

/// Names discovered but not yet committed, with their declared dependencies.
type Staged = BTreeMap<TargetName, BTreeSet<TargetName>>;

/// Incremental dependency graph over target names.
///
/// Invariants maintained by every public mutation:
/// - `b ∈ provides[a]` iff `a ∈ depends[b]`; empty `provides` entries are
///   removed.
/// - a name has a `depends` entry iff it is active or referenced by some
///   other entry; unreferenced, inactive names are collected immediately.
///
/// Discovery is two-phase: everything a mutation needs is resolved first and
/// only then committed, so a resolution error leaves the graph untouched.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    depends: HashMap<TargetName, BTreeSet<TargetName>>,
    provides: HashMap<TargetName, BTreeSet<TargetName>>,
    active: BTreeSet<TargetName>,
    reject_cycles: bool,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail discovery with [`WavebuildError::DependencyCycle`] instead of
    /// admitting cyclic declarations into the graph.
    pub fn with_cycle_rejection(mut self, reject_cycles: bool) -> Self {
        self.reject_cycles = reject_cycles;
        self
    }

    /// Direct dependencies of a tracked target.
    pub fn dependencies(&self, name: &str) -> Option<&BTreeSet<TargetName>> {
        self.depends.get(name)
    }

    /// Direct dependents of a target (empty for untracked or leaf-less names).
    pub fn dependents(&self, name: &str) -> Option<&BTreeSet<TargetName>> {
        self.provides.get(name)
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.depends.contains_key(name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    pub fn active_targets(&self) -> &BTreeSet<TargetName> {
        &self.active
    }

    /// All tracked names, sorted.
    pub fn tracked_targets(&self) -> BTreeSet<TargetName> {
        self.depends.keys().cloned().collect()
    }

    /// Mark `name` active and track it together with every transitive
    /// dependency that is not tracked yet.
    pub fn add_top_level_target(
        &mut self,
        name: &str,
        resolver: &dyn TargetResolver,
    ) -> Result<GraphChanges> {
        info!(target = %name, "adding top level target");

        if self.active.contains(name) {
            debug!(target = %name, "target already active; nothing to do");
            return Ok(GraphChanges::default());
        }

        let mut staged = Staged::new();
        self.stage(name, resolver, &mut staged)?;
        if self.reject_cycles {
            self.ensure_acyclic(name, &staged)?;
        }

        let mut rec = Recording::default();
        self.active.insert(name.to_string());
        self.commit(staged, &mut rec);
        self.dump_state();

        Ok(self.finish(rec))
    }

    /// Unmark `name` as active and collect it and every dependency that is no
    /// longer reachable from a remaining active root.
    pub fn remove_top_level_target(&mut self, name: &str) -> GraphChanges {
        info!(target = %name, "removing top level target");

        if !self.active.remove(name) {
            debug!(target = %name, "target is not active; nothing to do");
            return GraphChanges::default();
        }

        let mut rec = Recording::default();
        self.collect_garbage(name, &mut rec);
        self.dump_state();

        self.finish(rec)
    }

    /// Re-resolve the dependency set of a tracked target.
    ///
    /// Dropped dependencies that become unreferenced are untracked, newly
    /// declared ones are tracked, and every member of the ancestor closure of
    /// `name` (including `name` itself) is reported as refreshed.
    pub fn refresh_target(
        &mut self,
        name: &str,
        resolver: &dyn TargetResolver,
    ) -> Result<GraphChanges> {
        info!(target = %name, "refreshing target");

        if !self.depends.contains_key(name) {
            return Err(WavebuildError::NotTracked(name.to_string()));
        }

        let new_deps = resolver.dependencies(name)?;
        let mut staged = Staged::new();
        staged.insert(name.to_string(), new_deps.clone());
        for dep in &new_deps {
            self.stage(dep, resolver, &mut staged)?;
        }
        if self.reject_cycles {
            self.ensure_acyclic(name, &staged)?;
        }

        let mut rec = Recording::default();
        let old_deps = self.detach(name);
        self.commit(staged, &mut rec);
        // `name` was replaced in place, not newly tracked.
        rec.added.remove(name);
        for dep in old_deps.iter().filter(|d| !new_deps.contains(*d)) {
            self.collect_garbage(dep, &mut rec);
        }
        self.dump_state();

        let mut changes = self.finish(rec);
        changes.refreshed = self.ancestors(name);
        Ok(changes)
    }

    /// Everything that directly or indirectly depends on `name`, plus `name`.
    pub fn ancestors(&self, name: &str) -> BTreeSet<TargetName> {
        let mut closure = BTreeSet::new();
        let mut queue = VecDeque::from([name.to_string()]);

        while let Some(current) = queue.pop_front() {
            if !closure.insert(current.clone()) {
                continue;
            }
            if let Some(dependents) = self.provides.get(&current) {
                queue.extend(dependents.iter().cloned());
            }
        }

        closure
    }

    /// Resolve `name` and its untracked transitive dependencies into `staged`.
    ///
    /// `name` is registered before recursing so cyclic declarations terminate.
    fn stage(
        &self,
        name: &str,
        resolver: &dyn TargetResolver,
        staged: &mut Staged,
    ) -> Result<()> {
        if self.depends.contains_key(name) || staged.contains_key(name) {
            return Ok(());
        }

        let deps = resolver.dependencies(name)?;
        trace!(target = %name, ?deps, "resolved dependencies");
        staged.insert(name.to_string(), deps.clone());

        for dep in &deps {
            self.stage(dep, resolver, staged)?;
        }
        Ok(())
    }

    fn ensure_acyclic(&self, start: &str, staged: &Staged) -> Result<()> {
        let cycle = find_cycle_from(start, |n| {
            staged.get(n).or_else(|| self.depends.get(n))
        });
        match cycle {
            Some(path) => Err(WavebuildError::DependencyCycle(path.join(" -> "))),
            None => Ok(()),
        }
    }

    fn commit(&mut self, staged: Staged, rec: &mut Recording) {
        for (name, deps) in staged {
            for dep in &deps {
                self.provides
                    .entry(dep.clone())
                    .or_default()
                    .insert(name.clone());
            }
            self.depends.insert(name.clone(), deps);
            rec.added.insert(name);
        }
    }

    /// Remove the forward entry of `name` and its back-references, returning
    /// the dependencies it had.
    fn detach(&mut self, name: &str) -> BTreeSet<TargetName> {
        let deps = self.depends.remove(name).unwrap_or_default();
        for dep in &deps {
            self.unlink(dep, name);
        }
        deps
    }

    fn unlink(&mut self, dependency: &str, dependent: &str) {
        if let Some(dependents) = self.provides.get_mut(dependency) {
            dependents.remove(dependent);
            if dependents.is_empty() {
                self.provides.remove(dependency);
            }
        }
    }

    /// Reference-counted collection starting at `start`: a name is deleted
    /// only when it is neither active nor provided to anyone.
    fn collect_garbage(&mut self, start: &str, rec: &mut Recording) {
        let mut stack = vec![start.to_string()];

        while let Some(name) = stack.pop() {
            if self.active.contains(&name) || self.provides.contains_key(&name) {
                continue;
            }
            if !self.depends.contains_key(&name) {
                continue;
            }

            let deps = self.detach(&name);
            stack.extend(deps);
            rec.removed.insert(name);
        }
    }

    fn finish(&self, rec: Recording) -> GraphChanges {
        let changes = rec.finish();
        for name in &changes.tracked {
            debug!(target = %name, "tracking");
        }
        for name in &changes.untracked {
            debug!(target = %name, "untracking");
        }
        changes
    }

    fn dump_state(&self) {
        trace!(active = ?self.active, depends = ?self.depends, provides = ?self.provides, "graph state");
    }
}
