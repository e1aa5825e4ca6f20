// src/backend/process.rs

//! Blocking tool invocation.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::build::{BuildFailure, BuildResult};

const STDERR_TAIL_LINES: usize = 40;

/// Captured result of one finished tool run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Failure value for a non-zero exit: `<what> exited with status N`
    /// followed by the last lines of the tool's stderr.
    pub fn failure(&self, what: &str) -> BuildFailure {
        let lines: Vec<&str> = self.stderr.trim_end().lines().collect();
        let stderr = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        if stderr.is_empty() {
            BuildFailure::new(format!("{what} exited with status {}", self.exit_code))
        } else {
            BuildFailure::new(format!(
                "{what} exited with status {}\n{stderr}",
                self.exit_code
            ))
        }
    }
}

/// Run `program` with `args`, waiting for it to exit.
///
/// Spawn and wait errors are returned as `Err`; a non-zero exit is a normal
/// [`ProcessOutput`] with `success == false`.
pub fn run_process(program: &str, args: &[String], cwd: Option<&Path>) -> Result<ProcessOutput> {
    info!(program, args = %args.join(" "), "running process");

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .with_context(|| format!("spawning process '{program}'"))?;

    let result = ProcessOutput {
        exit_code: output.status.code().unwrap_or(-1),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !result.stdout.is_empty() {
        debug!(program, "stdout: {}", result.stdout.trim_end());
    }
    if !result.stderr.is_empty() {
        debug!(program, "stderr: {}", result.stderr.trim_end());
    }
    debug!(program, exit_code = result.exit_code, "process exited");

    Ok(result)
}

/// Run a shell command line through the platform shell.
pub fn run_shell(command_line: &str, cwd: &Path) -> Result<ProcessOutput> {
    if cfg!(windows) {
        run_process("cmd", &["/C".to_string(), command_line.to_string()], Some(cwd))
    } else {
        run_process("sh", &["-c".to_string(), command_line.to_string()], Some(cwd))
    }
}

/// Turn a spawn error into a failure value for `target`.
pub fn spawn_failure(target: &str, err: &anyhow::Error) -> BuildResult {
    BuildResult::Failure(BuildFailure::with_causes(
        format!("cannot build {target}"),
        vec![BuildFailure::new(format!("{err:#}"))],
    ))
}
