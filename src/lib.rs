// src/lib.rs

pub mod backend;
pub mod build;
pub mod cli;
pub mod config;
pub mod definition;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod graph;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::build::BuildOutcome;
use crate::cli::CliArgs;
use crate::config::{DaemonConfig, default_config_path, load_or_default};
use crate::definition::DefinitionLoader;
use crate::engine::{DaemonEvent, Manager, Session};
use crate::fs::{FileSystem, RealFileSystem};
use crate::graph::DependencyGraph;
use crate::watch::FileWatchPipeline;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings loading
/// - the manager (graph, scheduler, backends, pools)
/// - the lifecycle event consumer
/// - (optional) the file watch pipeline
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let (config_path, explicit) = match &args.config {
        Some(path) => (PathBuf::from(path), true),
        None => (default_config_path(), false),
    };
    let cfg = load_or_default(&config_path, explicit)?;
    info!(root = ?cfg.root(), "project root");

    if args.targets.is_empty() {
        bail!("no targets given");
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    if args.dry_run {
        print_dry_run(&cfg, fs, &args.targets)?;
        return Ok(());
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel::<DaemonEvent>();
    let consumer = tokio::spawn(consume_events(event_rx));

    let manager = Arc::new(Manager::from_config(&cfg, Arc::clone(&fs), Arc::new(event_tx))?);

    let mut failed = Vec::new();
    for target in &args.targets {
        let m = Arc::clone(&manager);
        let name = target.clone();
        let outcome = tokio::task::spawn_blocking(move || m.build_target(&name)).await??;
        report_outcome(target, &outcome);
        if !outcome.is_success() {
            failed.push(target.clone());
        }
    }

    if !args.once {
        let pipeline = Arc::new(watch_pipeline(&cfg, &manager, fs));
        manager.start_watching(&pipeline, cfg.debounce())?;
        info!("watching for changes; press Ctrl-C to stop");

        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
        }
        info!("shutdown requested");
    }

    let m = Arc::clone(&manager);
    tokio::task::spawn_blocking(move || m.shutdown()).await?;
    // The builder holds the last event sender.
    drop(manager);
    if let Err(e) = consumer.await {
        debug!(error = %e, "event consumer ended abnormally");
    }

    if args.once && !failed.is_empty() {
        bail!("failed to build: {}", failed.join(", "));
    }
    Ok(())
}

fn watch_pipeline(cfg: &DaemonConfig, manager: &Manager, fs: Arc<dyn FileSystem>) -> FileWatchPipeline {
    let ignored = [
        &cfg.project.output_dir,
        &cfg.project.object_dir,
        &cfg.project.bin_dir,
    ]
    .iter()
    .map(|dir| dir.to_string_lossy().replace('\\', "/"))
    .collect();

    let pipeline = FileWatchPipeline::new(cfg.root(), Arc::clone(manager.registry()))
        .with_ignored_dirs(ignored);
    if cfg.watch.use_hash {
        pipeline.with_content_hashes(fs)
    } else {
        pipeline
    }
}

/// Log lifecycle events until every sender is gone.
async fn consume_events(mut rx: mpsc::UnboundedReceiver<DaemonEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            DaemonEvent::Tracked(name) => debug!(target = %name, "tracked"),
            DaemonEvent::Untracked(name) => debug!(target = %name, "untracked"),
            DaemonEvent::Refreshed(name) => debug!(target = %name, "refreshed"),
            DaemonEvent::BuildStarted(name) => info!(target = %name, "building"),
            DaemonEvent::BuildFinished { target, results } => {
                let failures: Vec<String> = results
                    .iter()
                    .filter(|r| !r.ok())
                    .map(|r| r.error_message("  "))
                    .collect();
                if failures.is_empty() {
                    info!(target = %target, artifacts = results.len(), "built");
                } else {
                    warn!(target = %target, "build failed:\n{}", failures.join("\n"));
                }
            }
        }
    }
    debug!("event consumer finished");
}

fn report_outcome(target: &str, outcome: &BuildOutcome) {
    match outcome {
        BuildOutcome::Success { artifacts } => {
            println!("{target}: ok ({} artifacts)", artifacts.len());
        }
        BuildOutcome::Failure { message } => {
            println!("{target}: FAILED");
            for line in message.lines() {
                println!("  {line}");
            }
        }
    }
}

/// Resolve the closure of `targets` and print it without building.
fn print_dry_run(cfg: &DaemonConfig, fs: Arc<dyn FileSystem>, targets: &[String]) -> Result<()> {
    let loader = DefinitionLoader::from_config(cfg, fs);
    let session = Session::new(&loader);
    let mut graph = DependencyGraph::new().with_cycle_rejection(cfg.graph.reject_cycles);

    for target in targets {
        graph.add_top_level_target(target, &session)?;
    }

    println!("wavebuild dry-run");
    println!("  root = {}", cfg.root().display());
    println!("  active = {:?}", graph.active_targets());
    println!();

    let tracked = graph.tracked_targets();
    println!("targets ({}):", tracked.len());
    for name in &tracked {
        let target = session.load(name)?;
        println!("  - {name} [{}]", target.mode());
        if let Some(deps) = graph.dependencies(name)
            && !deps.is_empty()
        {
            println!("      deps: {:?}", deps);
        }
        let globs = target.watch_globs();
        if !globs.is_empty() {
            println!("      watch: {:?}", globs);
        }
    }

    debug!("dry-run complete (no build)");
    Ok(())
}
