// src/engine/result.rs

//! Per-task outcomes and aggregate run statistics.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::dag::TaskId;

/// What a successful task body produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
}

impl TaskOutput {
    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            stdout: stdout.into(),
        }
    }
}

/// Why a task body failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{reason}")]
pub struct TaskFailure {
    pub reason: String,
    pub exit_code: Option<i32>,
}

impl TaskFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            exit_code: None,
        }
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }
}

/// Why a task was never executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// An ancestor failed; `cause` is the task that failed.
    UpstreamFailed { cause: TaskId },
    /// The run was cancelled before the task was dispatched.
    Cancelled,
}

/// Terminal outcome of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded(TaskOutput),
    Failed(TaskFailure),
    Skipped { reason: SkipReason },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TaskOutcome::Skipped { .. })
    }

    /// Coarse classification, handy for comparing runs.
    pub fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Succeeded(_) => "succeeded",
            TaskOutcome::Failed(_) => "failed",
            TaskOutcome::Skipped { .. } => "skipped",
        }
    }
}

impl From<Result<TaskOutput, TaskFailure>> for TaskOutcome {
    fn from(result: Result<TaskOutput, TaskFailure>) -> Self {
        match result {
            Ok(output) => TaskOutcome::Succeeded(output),
            Err(failure) => TaskOutcome::Failed(failure),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl RunStatistics {
    /// Count outcomes; `clock` is the monotonic instant the run started at.
    pub fn tally<'a>(
        outcomes: impl IntoIterator<Item = &'a TaskOutcome>,
        started_at: DateTime<Utc>,
        clock: Instant,
    ) -> Self {
        let mut stats = Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            started_at,
            finished_at: Utc::now(),
            elapsed: clock.elapsed(),
        };

        for outcome in outcomes {
            stats.total += 1;
            match outcome {
                TaskOutcome::Succeeded(_) => stats.succeeded += 1,
                TaskOutcome::Failed(_) => stats.failed += 1,
                TaskOutcome::Skipped { .. } => stats.skipped += 1,
            }
        }

        stats
    }
}

/// Everything one execution produced. Never mutated after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub outcomes: BTreeMap<TaskId, TaskOutcome>,
    /// Wall-clock duration of each executed task body.
    pub timings: BTreeMap<TaskId, Duration>,
    pub stats: RunStatistics,
}

impl RunResult {
    pub fn outcome(&self, id: &TaskId) -> Option<&TaskOutcome> {
        self.outcomes.get(id)
    }

    /// `true` when nothing failed and nothing was skipped.
    pub fn is_success(&self) -> bool {
        self.stats.failed == 0 && self.stats.skipped == 0
    }

    /// Task id -> outcome label, for comparing the classification of runs.
    pub fn classification(&self) -> BTreeMap<TaskId, &'static str> {
        self.outcomes
            .iter()
            .map(|(id, outcome)| (id.clone(), outcome.label()))
            .collect()
    }
}
