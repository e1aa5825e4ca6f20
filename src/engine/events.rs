// src/engine/events.rs

//! Lifecycle notifications.
//!
//! The core emits a small closed set of tagged events. Sinks are pure
//! observers: `emit` must never block, and the core never waits for a sink
//! to consume anything.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use crate::build::BuildResult;
use crate::types::TargetName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEvent {
    Tracked(TargetName),
    Untracked(TargetName),
    Refreshed(TargetName),
    BuildStarted(TargetName),
    BuildFinished {
        target: TargetName,
        results: Arc<Vec<BuildResult>>,
    },
}

impl DaemonEvent {
    /// Name of the target the event is about.
    pub fn target(&self) -> &str {
        match self {
            DaemonEvent::Tracked(name)
            | DaemonEvent::Untracked(name)
            | DaemonEvent::Refreshed(name)
            | DaemonEvent::BuildStarted(name) => name,
            DaemonEvent::BuildFinished { target, .. } => target,
        }
    }
}

/// Observer of [`DaemonEvent`]s.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DaemonEvent);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DaemonEvent) {}
}

impl EventSink for mpsc::UnboundedSender<DaemonEvent> {
    fn emit(&self, event: DaemonEvent) {
        if self.send(event).is_err() {
            trace!("event receiver dropped; discarding event");
        }
    }
}
