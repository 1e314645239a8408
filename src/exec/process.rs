// src/exec/process.rs

//! Production action runner.
//!
//! `noop` succeeds immediately, `print` logs its message and `command` runs
//! through the platform shell with `tokio::process`.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::dag::{Action, CommandParams, Task};
use crate::engine::{TaskFailure, TaskOutput};

use super::backend::{ActionRunner, RunFuture};

/// Environment variables exported to every `command` action.
pub const ENV_HOST: &str = "TASK_CORE_HOST";
pub const ENV_SERVICE: &str = "TASK_CORE_SERVICE";
pub const ENV_TASK: &str = "TASK_CORE_TASK";

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ActionRunner for ProcessRunner {
    fn run(&self, task: Task) -> RunFuture<'_> {
        Box::pin(async move {
            match &task.params {
                Action::Noop => Ok(TaskOutput::default()),
                Action::Print(params) => {
                    info!(task = %task.id, "{}", params.message);
                    Ok(TaskOutput::with_stdout(params.message.clone()))
                }
                Action::Command(params) => run_command(&task, params).await,
            }
        })
    }
}

/// Outcome of a finished child process.
struct Finished {
    code: Option<i32>,
    success: bool,
    stdout: String,
    stderr: String,
}

async fn run_command(
    task: &Task,
    params: &CommandParams,
) -> std::result::Result<TaskOutput, TaskFailure> {
    let finished = match run_command_inner(task, params).await {
        Ok(finished) => finished,
        Err(err) => {
            error!(task = %task.id, error = %err, "task execution error");
            return Err(TaskFailure::new(format!("{err:#}")));
        }
    };

    info!(
        task = %task.id,
        exit_code = ?finished.code,
        success = finished.success,
        "task process exited"
    );

    if finished.success {
        return Ok(TaskOutput {
            exit_code: finished.code,
            stdout: finished.stdout,
        });
    }

    let reason = match finished.code {
        Some(code) => format!("command exited with status {code}"),
        None => "command terminated by signal".to_string(),
    };
    let reason = match finished.stderr.lines().last() {
        Some(line) if !line.trim().is_empty() => format!("{reason}: {}", line.trim()),
        _ => reason,
    };

    let failure = TaskFailure::new(reason);
    Err(match finished.code {
        Some(code) => failure.with_exit_code(code),
        None => failure,
    })
}

async fn run_command_inner(task: &Task, params: &CommandParams) -> Result<Finished> {
    debug!(task = %task.id, cmd = %params.cmd, "starting task process");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&params.cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&params.cmd);
        c
    };

    cmd.env(ENV_HOST, &task.host)
        .env(ENV_SERVICE, &task.service)
        .env(ENV_TASK, task.id.as_str())
        .envs(&params.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = &params.workdir {
        cmd.current_dir(dir);
    }

    let child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task.id))?;

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for process of task '{}'", task.id))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    for line in stdout.lines() {
        debug!(task = %task.id, "stdout: {}", line);
    }
    for line in stderr.lines() {
        debug!(task = %task.id, "stderr: {}", line);
    }

    Ok(Finished {
        code: output.status.code(),
        success: output.status.success(),
        stdout,
        stderr,
    })
}
