// src/engine/manager.rs

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::backend::register_default_backends;
use crate::build::{BuildOutcome, BuildResult, BuildSummary, BuildTracker, Builder, WorkerPools};
use crate::config::DaemonConfig;
use crate::definition::{DefinitionLoader, Target, TargetLoader};
use crate::engine::events::{DaemonEvent, EventSink};
use crate::engine::session::Session;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::graph::{DependencyGraph, GraphChanges};
use crate::types::TargetName;
use crate::watch::{FileWatchPipeline, Modifications, WatchHandle, WatchRegistry};

struct ManagerState {
    graph: DependencyGraph,
    tracker: BuildTracker,
}

/// The daemon's single serialization point.
///
/// Every state-changing entry point takes the state lock for its whole
/// duration, including the build pass it triggers, so at most one build
/// pipeline runs at a time and callers always observe a settled state.
pub struct Manager {
    state: Mutex<ManagerState>,
    loader: Arc<dyn TargetLoader>,
    registry: Arc<RwLock<WatchRegistry>>,
    sink: Arc<dyn EventSink>,
    watch: Mutex<Option<WatchHandle>>,
}

impl Manager {
    pub fn new(
        loader: Arc<dyn TargetLoader>,
        builder: Builder,
        pools: Arc<WorkerPools>,
        registry: Arc<RwLock<WatchRegistry>>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            state: Mutex::new(ManagerState {
                graph: DependencyGraph::new(),
                tracker: BuildTracker::new(builder, pools),
            }),
            loader,
            registry,
            sink,
            watch: Mutex::new(None),
        }
    }

    /// Production wiring: layered definition files, the C++ and command
    /// backends and worker pools sized from `cfg`.
    pub fn from_config(
        cfg: &DaemonConfig,
        fs: Arc<dyn FileSystem>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let pools = Arc::new(WorkerPools::from_config(&cfg.pools)?);

        let mut builder = Builder::new(Arc::clone(&sink));
        register_default_backends(&mut builder, cfg, Arc::clone(&fs), Arc::clone(&pools));

        let loader = Arc::new(DefinitionLoader::from_config(cfg, fs));
        let registry = Arc::new(RwLock::new(WatchRegistry::new(
            cfg.project.definition_filename.clone(),
        )));

        Ok(Self::new(loader, builder, pools, registry, sink)
            .with_cycle_rejection(cfg.graph.reject_cycles))
    }

    pub fn with_cycle_rejection(self, reject_cycles: bool) -> Self {
        {
            let mut state = self.lock();
            let graph = std::mem::take(&mut state.graph);
            state.graph = graph.with_cycle_rejection(reject_cycles);
        }
        self
    }

    pub fn registry(&self) -> &Arc<RwLock<WatchRegistry>> {
        &self.registry
    }

    /// Request `name` as a top-level target and build everything dirty.
    ///
    /// Fails only when `name` or one of its dependencies cannot be resolved;
    /// the graph is left unchanged in that case.
    pub fn add_active_target(&self, name: &str) -> Result<BuildSummary> {
        let mut state = self.lock();
        self.add_locked(&mut state, name)?;
        Ok(self.build_locked(&mut state))
    }

    /// Drop `name` from the requested targets, untracking whatever is no
    /// longer reachable.
    pub fn remove_active_target(&self, name: &str) -> BuildSummary {
        let mut state = self.lock();
        let changes = state.graph.remove_top_level_target(name);
        let session = Session::new(self.loader.as_ref());
        self.apply_changes(&mut state, changes, &session);
        self.build_locked(&mut state)
    }

    /// Make `name` active if it is not yet, build, and report its outcome.
    pub fn build_target(&self, name: &str) -> Result<BuildOutcome> {
        let mut state = self.lock();
        self.add_locked(&mut state, name)?;
        self.build_locked(&mut state);

        let results = state.tracker.build_result(name);
        Ok(BuildOutcome::from_results(name, results.as_deref().map(Vec::as_slice)))
    }

    /// React to one batch from the watch pipeline: refresh every reported
    /// target, then build.
    ///
    /// A target that cannot be re-resolved (e.g. its definition file is
    /// half-written) is logged and keeps its previous state.
    pub fn on_modified_files(&self, mods: &Modifications) -> BuildSummary {
        let mut state = self.lock();
        let started = Instant::now();

        let session = Session::new(self.loader.as_ref());
        for name in mods.all_targets() {
            if !state.graph.is_tracked(&name) {
                debug!(target = %name, "no longer tracked; skipping refresh");
                continue;
            }
            match state.graph.refresh_target(&name, &session) {
                Ok(changes) => self.apply_changes(&mut state, changes, &session),
                Err(err) => warn!(target = %name, error = %err, "cannot refresh target"),
            }
        }
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "changes detection done");

        let build_started = Instant::now();
        let summary = self.build_locked(&mut state);
        info!(
            elapsed = ?build_started.elapsed(),
            built = summary.built.len(),
            failed = summary.failed.len(),
            "building changed targets done"
        );
        summary
    }

    pub fn active_targets(&self) -> BTreeSet<TargetName> {
        self.lock().graph.active_targets().clone()
    }

    pub fn tracked_targets(&self) -> BTreeSet<TargetName> {
        self.lock().graph.tracked_targets()
    }

    pub fn dependencies(&self, name: &str) -> Option<BTreeSet<TargetName>> {
        self.lock().graph.dependencies(name).cloned()
    }

    pub fn build_result(&self, name: &str) -> Option<Arc<Vec<BuildResult>>> {
        self.lock().tracker.build_result(name)
    }

    pub fn target(&self, name: &str) -> Option<Arc<Target>> {
        self.lock().tracker.target(name).cloned()
    }

    /// Route `pipeline` batches into [`Manager::on_modified_files`] and
    /// start watching.
    pub fn start_watching(
        self: &Arc<Self>,
        pipeline: &Arc<FileWatchPipeline>,
        window: Duration,
    ) -> Result<()> {
        let manager: Weak<Manager> = Arc::downgrade(self);
        pipeline.add_handler(move |mods| {
            if let Some(manager) = manager.upgrade() {
                manager.on_modified_files(mods);
            }
        });

        let handle = pipeline.spawn(window)?;
        *self.watch.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Stop watching, then wait for any build in progress.
    pub fn shutdown(&self) {
        let handle = self
            .watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop();
        }

        let state = self.lock();
        info!(
            active = state.graph.active_targets().len(),
            tracked = state.graph.tracked_targets().len(),
            "manager shut down"
        );
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add_locked(&self, state: &mut ManagerState, name: &str) -> Result<()> {
        let session = Session::new(self.loader.as_ref());
        let changes = state.graph.add_top_level_target(name, &session)?;
        self.apply_changes(state, changes, &session);
        Ok(())
    }

    fn build_locked(&self, state: &mut ManagerState) -> BuildSummary {
        if state.tracker.dirty().is_empty() {
            return BuildSummary::default();
        }

        let started = Instant::now();
        let ManagerState { graph, tracker } = state;
        let summary = tracker.build(graph);
        info!(
            waves = summary.waves,
            built = summary.built.len(),
            failed = summary.failed.len(),
            unschedulable = summary.unschedulable.len(),
            elapsed = ?started.elapsed(),
            "build pass finished"
        );
        summary
    }

    /// Mirror graph changes into the build tracker and the watch registry.
    fn apply_changes(&self, state: &mut ManagerState, changes: GraphChanges, session: &Session<'_>) {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);

        for name in &changes.tracked {
            info!(target = %name, "tracking");
            match session.load(name) {
                Ok(target) => {
                    if let Err(err) = registry.register_target(&target) {
                        warn!(target = %name, error = %err, "cannot watch target sources");
                    }
                    state.tracker.add_target(target);
                }
                Err(err) => {
                    warn!(target = %name, error = %err, "cannot load tracked target");
                    state.tracker.mark_dirty(name);
                }
            }
            self.sink.emit(DaemonEvent::Tracked(name.clone()));
        }

        for name in &changes.untracked {
            info!(target = %name, "untracking");
            registry.unregister(name);
            state.tracker.remove_target(name);
            self.sink.emit(DaemonEvent::Untracked(name.clone()));
        }

        for name in &changes.refreshed {
            debug!(target = %name, "refreshing");
            match session.load(name) {
                Ok(target) => {
                    if let Err(err) = registry.register_target(&target) {
                        warn!(target = %name, error = %err, "cannot watch target sources");
                    }
                    state.tracker.reload_target(target);
                }
                Err(err) => {
                    warn!(target = %name, error = %err, "cannot reload target; keeping previous declaration");
                    state.tracker.mark_dirty(name);
                }
            }
            self.sink.emit(DaemonEvent::Refreshed(name.clone()));
        }
    }
}
