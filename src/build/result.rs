// src/build/result.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::types::TargetName;

/// Artifact handle produced by a successful build and consumed by the
/// backends of dependent targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// A static archive plus what is needed to link against it.
    StaticLibrary {
        archive: PathBuf,
        lflags: Vec<String>,
        pkg_deps: BTreeSet<String>,
    },
    /// A linked executable.
    Executable { path: PathBuf },
    /// A command target that ran to completion; it produces nothing the
    /// daemon knows how to consume.
    Command { target: TargetName },
}

/// A failed build with the ordered failures that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    message: String,
    causes: Vec<BuildFailure>,
}

impl BuildFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    pub fn with_causes(message: impl Into<String>, causes: Vec<BuildFailure>) -> Self {
        Self {
            message: message.into(),
            causes,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn causes(&self) -> &[BuildFailure] {
        &self.causes
    }

    /// Whether this failure or any transitive cause carries `message`.
    pub fn has_cause(&self, message: &str) -> bool {
        self.message == message || self.causes.iter().any(|c| c.has_cause(message))
    }

    /// Render the causal tree. Every line of this failure is prefixed with
    /// `indent`; each level of causes adds two spaces.
    ///
    /// ```text
    /// cannot build app, because
    ///   cannot build lib, because
    ///     lib.cc:3: error: expected ';'
    /// ```
    pub fn error_message(&self, indent: &str) -> String {
        let own = indent_lines(self.message.trim_end(), indent);
        if self.causes.is_empty() {
            return own;
        }

        let nested = format!("{indent}  ");
        let causes: Vec<String> = self
            .causes
            .iter()
            .map(|cause| cause.error_message(&nested))
            .collect();
        format!("{own}, because\n{}", causes.join("\n"))
    }
}

fn indent_lines(text: &str, indent: &str) -> String {
    if text.is_empty() {
        return indent.to_string();
    }
    text.lines()
        .map(|line| format!("{indent}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error_message(""))
    }
}

/// Outcome of building one artifact of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildResult {
    Success(Artifact),
    Failure(BuildFailure),
}

impl BuildResult {
    pub fn failure(message: impl Into<String>) -> Self {
        BuildResult::Failure(BuildFailure::new(message))
    }

    pub fn ok(&self) -> bool {
        matches!(self, BuildResult::Success(_))
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            BuildResult::Success(artifact) => Some(artifact),
            BuildResult::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&BuildFailure> {
        match self {
            BuildResult::Success(_) => None,
            BuildResult::Failure(failure) => Some(failure),
        }
    }

    /// Rendered failure tree, or an empty string for a success.
    pub fn error_message(&self, indent: &str) -> String {
        self.as_failure()
            .map(|f| f.error_message(indent))
            .unwrap_or_default()
    }
}

/// What a blocking `build_target` call hands back to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success { artifacts: Vec<Artifact> },
    Failure { message: String },
}

impl BuildOutcome {
    /// Fold the cached results of `target` into a single outcome.
    ///
    /// `None` means the target has no cached result at all, which happens
    /// when the scheduler could not order it (e.g. a dependency cycle).
    pub fn from_results(target: &str, results: Option<&[BuildResult]>) -> Self {
        let Some(results) = results else {
            return BuildOutcome::Failure {
                message: format!(
                    "cannot build {target}: it was never scheduled (dependency cycle?)"
                ),
            };
        };

        let failures: Vec<BuildFailure> = results
            .iter()
            .filter_map(|r| r.as_failure().cloned())
            .collect();

        if failures.is_empty() {
            BuildOutcome::Success {
                artifacts: results.iter().filter_map(|r| r.artifact().cloned()).collect(),
            }
        } else {
            let message = failures
                .iter()
                .map(|f| f.error_message(""))
                .collect::<Vec<_>>()
                .join("\n");
            BuildOutcome::Failure { message }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success { .. })
    }
}
