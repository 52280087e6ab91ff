use std::process::Stdio;
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::registry::Task;

/// How a single run of a task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    /// Non-zero exit, termination by signal or failure to launch.
    /// Holds the captured stderr or the launch error.
    Failed { reason: String },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded)
    }
}

/// Runs the task's command to completion.
///
/// The payload is only written to stdin if the task accepts one,
/// otherwise stdin is closed. Stdout is discarded.
pub async fn run(task: &Task, payload: &[u8]) -> TaskOutcome {
    let id = fastrand::u64(..);
    log::info!(id, task = task.name.as_str(); "running task");

    let mut command = Command::new(&task.command);
    if let Some(directory) = &task.directory {
        command.current_dir(directory);
    }
    command
        .stdin(if task.accepts_payload {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let start = Instant::now();
    let outcome = match command.spawn() {
        Ok(mut child) => {
            if let Some(mut stdin) = child.stdin.take() {
                let payload = payload.to_vec();
                // Written concurrently, a task may produce stderr before it reads all input.
                tokio::spawn(async move {
                    if let Err(e) = stdin.write_all(&payload).await {
                        log::debug!(id; "stdin not fully consumed: {e}");
                    }
                });
            }
            match child.wait_with_output().await {
                Ok(out) if out.status.success() => TaskOutcome::Succeeded,
                Ok(out) => {
                    log::debug!(id; "Status: {}", out.status);
                    TaskOutcome::Failed {
                        reason: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
                    }
                }
                Err(e) => TaskOutcome::Failed {
                    reason: e.to_string(),
                },
            }
        }
        Err(e) => TaskOutcome::Failed {
            reason: format!("failed to launch '{}': {e}", task.command),
        },
    };
    let time_taken = start.elapsed();

    match &outcome {
        TaskOutcome::Succeeded => {
            log::debug!(id, time_taken:debug; "task '{}' succeeded", task.name);
        }
        TaskOutcome::Failed { reason } => {
            log::error!(id, time_taken:debug; "error running task '{}': {reason}", task.name);
        }
    }
    outcome
}
