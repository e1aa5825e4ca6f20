// src/backend/command.rs

use std::path::PathBuf;

use tracing::info;

use crate::backend::process::{run_shell, spawn_failure};
use crate::build::{Artifact, BuildBackend, BuildContext, BuildFailure, BuildResult};
use crate::definition::Declaration;

/// Runs a `command` target's shell line in the target's directory.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    root: PathBuf,
}

impl CommandBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BuildBackend for CommandBackend {
    fn build(&self, ctx: &BuildContext<'_>, name: &str) -> Vec<BuildResult> {
        let Some(target) = ctx.target(name) else {
            return vec![BuildResult::failure(format!("cannot build {name}: target is not loaded"))];
        };
        let Declaration::Command(decl) = target.declaration() else {
            return vec![BuildResult::failure(format!(
                "cannot build {name}: not a command target"
            ))];
        };

        let cwd = self.root.join(target.dir());
        info!(target = %name, cmd = %decl.cmd, "running command");

        match run_shell(&decl.cmd, &cwd) {
            Ok(out) if out.success => vec![BuildResult::Success(Artifact::Command {
                target: name.to_string(),
            })],
            Ok(out) => vec![BuildResult::Failure(BuildFailure::with_causes(
                format!("cannot build {name}"),
                vec![out.failure(&format!("command `{}`", decl.cmd))],
            ))],
            Err(err) => vec![spawn_failure(name, &err)],
        }
    }
}
