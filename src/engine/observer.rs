// src/engine/observer.rs

//! Progress reporting seam.

use std::time::Duration;

use tracing::{info, warn};

use crate::dag::{Task, TaskGraph, TaskId};
use crate::engine::result::{RunStatistics, SkipReason, TaskOutcome};

/// Receives progress notifications during a run.
///
/// All methods default to doing nothing so implementors only override what
/// they care about. Calls come from the coordinating loop, never from
/// workers.
pub trait RunObserver: Send + Sync {
    fn graph_built(&self, _graph: &TaskGraph) {}

    fn task_started(&self, _task: &Task) {}

    /// `elapsed` is `None` for tasks that never ran (skipped).
    fn task_finished(&self, _task: &TaskId, _outcome: &TaskOutcome, _elapsed: Option<Duration>) {}

    fn run_finished(&self, _stats: &RunStatistics) {}
}

/// Default observer: structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn graph_built(&self, graph: &TaskGraph) {
        info!(
            tasks = graph.len(),
            edges = graph.edge_count(),
            "task graph ready"
        );
    }

    fn task_started(&self, task: &Task) {
        info!(
            task = %task.id,
            host = %task.host,
            service = %task.service,
            kind = task.params.kind(),
            "starting task"
        );
    }

    fn task_finished(&self, task: &TaskId, outcome: &TaskOutcome, elapsed: Option<Duration>) {
        match outcome {
            TaskOutcome::Succeeded(output) => info!(
                task = %task,
                exit_code = ?output.exit_code,
                elapsed = ?elapsed,
                "task succeeded"
            ),
            TaskOutcome::Failed(failure) => warn!(
                task = %task,
                exit_code = ?failure.exit_code,
                reason = %failure.reason,
                elapsed = ?elapsed,
                "task failed"
            ),
            TaskOutcome::Skipped {
                reason: SkipReason::UpstreamFailed { cause },
            } => warn!(task = %task, cause = %cause, "task skipped: upstream failure"),
            TaskOutcome::Skipped {
                reason: SkipReason::Cancelled,
            } => info!(task = %task, "task skipped: run cancelled"),
        }
    }

    fn run_finished(&self, stats: &RunStatistics) {
        info!(
            total = stats.total,
            succeeded = stats.succeeded,
            failed = stats.failed,
            skipped = stats.skipped,
            elapsed = ?stats.elapsed,
            "run finished"
        );
    }
}
