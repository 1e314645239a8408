// src/dag/scheduler_step.rs

//! Result of feeding one completion into the scheduler.

use crate::dag::task::TaskId;
use crate::engine::SkipReason;

/// Structured result of a single scheduler "step".
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks whose last predecessor just succeeded, in enqueue order.
    pub newly_ready: Vec<TaskId>,
    /// Tasks withheld as a consequence of this step, sorted by id.
    pub newly_skipped: Vec<(TaskId, SkipReason)>,
    /// Whether every task is now terminal.
    pub run_finished: bool,
}
