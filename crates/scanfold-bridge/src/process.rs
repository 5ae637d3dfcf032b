// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded child-process execution shared by the host backends.

use std::process::{Output, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use scanfold_core::error::ScanError;

/// Why a host command produced no output.
#[derive(Debug, Error)]
pub(crate) enum CommandError {
    #[error("could not start: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

impl CommandError {
    /// Convert into the public error, naming the program that failed.
    pub(crate) fn into_scan_error(self, program: &str) -> ScanError {
        ScanError::HostCommand {
            command: program.to_string(),
            detail: self.to_string(),
        }
    }
}

/// Run `command` to completion, killing it if it outlives `timeout`.
pub(crate) async fn run_bounded(
    mut command: Command,
    timeout: Duration,
) -> std::result::Result<Output, CommandError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(command = ?command.as_std(), timeout_secs = timeout.as_secs(), "running host command");

    match tokio::time::timeout(timeout, command.output()).await {
        Ok(output) => Ok(output?),
        Err(_) => Err(CommandError::TimedOut(timeout)),
    }
}

/// Diagnostic text of a failed command: stderr if present, else stdout,
/// else the exit status.
pub(crate) fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        return stderr.trim().to_string();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        return stdout.trim().to_string();
    }
    format!("exited with {}", output.status)
}
