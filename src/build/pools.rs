// src/build/pools.rs

//! Named worker pools, created once at startup and shared by handle.

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

use crate::config::PoolsSection;
use crate::errors::{Result, WavebuildError};

/// The two pools the scheduler uses:
/// - `wave` runs the single-target builds of one wave concurrently.
/// - `sources` runs per-source compilation inside one target's build.
///
/// They are distinct so a wave member waiting on its own compile jobs never
/// occupies a thread those jobs need.
pub struct WorkerPools {
    wave: ThreadPool,
    sources: ThreadPool,
}

impl WorkerPools {
    pub fn new(wave_workers: usize, source_workers: usize) -> Result<Self> {
        let wave = build_pool("wave", wave_workers)?;
        let sources = build_pool("sources", source_workers)?;
        Ok(Self { wave, sources })
    }

    pub fn from_config(cfg: &PoolsSection) -> Result<Self> {
        Self::new(cfg.effective_wave_workers(), cfg.effective_source_workers())
    }

    pub fn wave(&self) -> &ThreadPool {
        &self.wave
    }

    pub fn sources(&self) -> &ThreadPool {
        &self.sources
    }
}

impl std::fmt::Debug for WorkerPools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPools")
            .field("wave", &self.wave.current_num_threads())
            .field("sources", &self.sources.current_num_threads())
            .finish()
    }
}

fn build_pool(name: &'static str, workers: usize) -> Result<ThreadPool> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(move |i| format!("{name}-{i}"))
        .build()
        .map_err(|e| WavebuildError::ConfigError(format!("cannot create {name} pool: {e}")))?;
    info!(pool = name, workers, "worker pool started");
    Ok(pool)
}
