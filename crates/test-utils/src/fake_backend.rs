use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

use wavebuild::build::{Artifact, BuildBackend, BuildContext, BuildResult};
use wavebuild::engine::{DaemonEvent, EventSink};
use wavebuild::types::TargetName;

/// A fake backend that:
/// - records which targets were built, in call order
/// - records, per call, which direct dependencies already had results
/// - succeeds with `Artifact::Command` unless the target is scripted to
///   fail or panic.
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<TargetName>>,
    observed: Mutex<BTreeMap<TargetName, BTreeMap<TargetName, bool>>>,
    failing: Mutex<BTreeSet<TargetName>>,
    panicking: Mutex<BTreeSet<TargetName>>,
    delay: Option<Duration>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long in every build (to make waves overlap in time).
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn heal(&self, name: &str) {
        self.failing.lock().unwrap().remove(name);
    }

    pub fn panic_on(&self, name: &str) {
        self.panicking.lock().unwrap().insert(name.to_string());
    }

    pub fn calls(&self) -> Vec<TargetName> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|n| *n == name).count()
    }

    pub fn was_built(&self, name: &str) -> bool {
        self.call_count(name) > 0
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
        self.observed.lock().unwrap().clear();
    }

    /// For the last build of `name`: direct dependency → whether it had a
    /// successful cached result at that time.
    pub fn observed(&self, name: &str) -> BTreeMap<TargetName, bool> {
        self.observed
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// The message the fake uses for a scripted failure of `name`.
    pub fn failure_message(name: &str) -> String {
        format!("{name}: scripted failure")
    }
}

impl BuildBackend for FakeBackend {
    fn build(&self, ctx: &BuildContext<'_>, name: &str) -> Vec<BuildResult> {
        self.calls.lock().unwrap().push(name.to_string());

        let seen: BTreeMap<TargetName, bool> = ctx
            .target(name)
            .map(|t| {
                t.deps()
                    .iter()
                    .map(|d| {
                        let ok = ctx
                            .results(d)
                            .is_some_and(|rs| rs.iter().all(BuildResult::ok));
                        (d.clone(), ok)
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.observed.lock().unwrap().insert(name.to_string(), seen);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.panicking.lock().unwrap().contains(name) {
            panic!("{name}: scripted panic");
        }
        if self.failing.lock().unwrap().contains(name) {
            return vec![BuildResult::failure(Self::failure_message(name))];
        }
        vec![BuildResult::Success(Artifact::Command {
            target: name.to_string(),
        })]
    }
}

/// Event sink that keeps everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DaemonEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DaemonEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn tracked(&self) -> Vec<TargetName> {
        self.filter(|e| matches!(e, DaemonEvent::Tracked(_)))
    }

    pub fn untracked(&self) -> Vec<TargetName> {
        self.filter(|e| matches!(e, DaemonEvent::Untracked(_)))
    }

    pub fn refreshed(&self) -> Vec<TargetName> {
        self.filter(|e| matches!(e, DaemonEvent::Refreshed(_)))
    }

    pub fn started(&self) -> Vec<TargetName> {
        self.filter(|e| matches!(e, DaemonEvent::BuildStarted(_)))
    }

    pub fn finished(&self) -> Vec<TargetName> {
        self.filter(|e| matches!(e, DaemonEvent::BuildFinished { .. }))
    }

    fn filter(&self, pred: impl Fn(&DaemonEvent) -> bool) -> Vec<TargetName> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| pred(e))
            .map(|e| e.target().to_string())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: DaemonEvent) {
        self.events.lock().unwrap().push(event);
    }
}
