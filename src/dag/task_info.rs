// src/dag/task_info.rs

//! Per-run bookkeeping for one task.

use crate::dag::task::TaskId;

/// Execution state of a task within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// Waiting on at least one predecessor.
    Pending,
    /// All predecessors succeeded; waiting in the ready queue.
    Ready,
    /// Dispatched to a worker.
    Running,
    Succeeded,
    Failed,
    /// Withheld because an ancestor failed or the run was cancelled.
    Skipped,
}

impl TaskRunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskRunState::Succeeded | TaskRunState::Failed | TaskRunState::Skipped
        )
    }
}

/// Scheduler-side view of a task (internal).
#[derive(Debug, Clone)]
pub(crate) struct TaskInfo {
    pub id: TaskId,
    /// Predecessors that have not succeeded yet.
    pub unmet: usize,
    pub state: TaskRunState,
}

impl TaskInfo {
    pub fn new(id: TaskId, unmet: usize) -> Self {
        Self {
            id,
            unmet,
            state: TaskRunState::Pending,
        }
    }
}
