// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::errors::{Result, WavebuildError};
use crate::fs::FileSystem;
use crate::watch::debounce::spawn_accumulator;
use crate::watch::hash::ContentHashes;
use crate::watch::path_utils::{is_under_any, relative_str};
use crate::watch::registry::{Modifications, WatchRegistry};

/// Callback invoked with every non-empty batch resolution.
pub type ModificationHandler = Arc<dyn Fn(&Modifications) + Send + Sync>;

/// Turns batches of changed paths into [`Modifications`] and hands them to
/// the registered handlers.
///
/// The registry is shared with its owner, which keeps it current as targets
/// are tracked and untracked.
pub struct FileWatchPipeline {
    root: PathBuf,
    registry: Arc<RwLock<WatchRegistry>>,
    hashes: Option<Mutex<ContentHashes>>,
    ignored: Vec<String>,
    handlers: RwLock<Vec<ModificationHandler>>,
}

impl std::fmt::Debug for FileWatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatchPipeline")
            .field("root", &self.root)
            .field("use_hash", &self.hashes.is_some())
            .field("ignored", &self.ignored)
            .finish_non_exhaustive()
    }
}

impl FileWatchPipeline {
    pub fn new(root: impl Into<PathBuf>, registry: Arc<RwLock<WatchRegistry>>) -> Self {
        Self {
            root: root.into(),
            registry,
            hashes: None,
            ignored: Vec::new(),
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Drop events for files whose content did not change.
    pub fn with_content_hashes(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.hashes = Some(Mutex::new(ContentHashes::new(fs)));
        self
    }

    /// Ignore everything under these root-relative directories (build
    /// outputs, typically).
    pub fn with_ignored_dirs(mut self, dirs: Vec<String>) -> Self {
        self.ignored = dirs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &Arc<RwLock<WatchRegistry>> {
        &self.registry
    }

    pub fn add_handler(&self, handler: impl Fn(&Modifications) + Send + Sync + 'static) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    /// Resolve one batch of absolute paths and notify every handler if
    /// anything was invalidated. Returns the resolution.
    pub fn process_batch(&self, paths: Vec<PathBuf>) -> Modifications {
        let unique: Vec<PathBuf> = paths
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let unique = match &self.hashes {
            Some(hashes) => hashes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain_changed(unique),
            None => unique,
        };

        let rel_paths: Vec<String> = unique
            .iter()
            .filter_map(|p| relative_str(&self.root, p))
            .filter(|rel| !rel.is_empty() && !is_under_any(rel, &self.ignored))
            .collect();
        debug!(paths = ?rel_paths, "resolving batch");

        let mods = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(rel_paths.iter().map(String::as_str));

        if mods.is_empty() {
            debug!("batch touched no watched target");
            return mods;
        }

        info!(
            definitions = ?mods.definitions_changed,
            sources = ?mods.targets_changed,
            "files changed"
        );
        let handlers: Vec<ModificationHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in handlers {
            handler(&mods);
        }
        mods
    }

    /// Subscribe to the filesystem under the root and start the debounce
    /// accumulator thread.
    pub fn spawn(self: &Arc<Self>, window: Duration) -> Result<WatchHandle> {
        let (tx, rx) = crossbeam_channel::unbounded::<PathBuf>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_relevant(&event.kind) {
                        for path in event.paths {
                            if tx.send(path).is_err() {
                                debug!("accumulator gone; dropping event");
                            }
                        }
                    }
                }
                Err(err) => warn!(error = %err, "file watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        info!(root = ?self.root, debounce = ?window, "file watcher started");

        let pipeline = Arc::clone(self);
        let accumulator = spawn_accumulator(rx, window, move |batch: Vec<PathBuf>| {
            pipeline.process_batch(batch);
        })
        .map_err(WavebuildError::IoError)?;

        Ok(WatchHandle {
            watcher: Some(watcher),
            accumulator: Some(accumulator),
        })
    }
}

fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Keeps the subscription and the accumulator alive. Dropping it (or
/// calling [`WatchHandle::stop`]) unsubscribes, lets the accumulator flush
/// what it has buffered and joins it.
pub struct WatchHandle {
    watcher: Option<RecommendedWatcher>,
    accumulator: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("running", &self.accumulator.is_some())
            .finish()
    }
}

impl WatchHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the watcher drops the channel sender held by its callback.
        if self.watcher.take().is_some() {
            info!("file watcher stopped");
        }
        if let Some(handle) = self.accumulator.take()
            && handle.join().is_err()
        {
            warn!("debounce thread panicked");
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
