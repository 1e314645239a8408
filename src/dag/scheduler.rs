// src/dag/scheduler.rs

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::task::TaskId;
use crate::dag::task_info::{TaskInfo, TaskRunState};
use crate::engine::SkipReason;

/// Per-run dependency bookkeeping over an immutable [`TaskGraph`].
///
/// The scheduler is synchronous and does no IO. It is responsible for:
/// - counting unmet predecessors per task
/// - keeping a FIFO queue of ready tasks (ties broken by id)
/// - marking tasks as succeeded/failed
/// - skipping every transitive dependent of a failed task
/// - skipping everything not yet dispatched when the run is cancelled
#[derive(Debug)]
pub struct Scheduler<'g> {
    graph: &'g TaskGraph,
    tasks: BTreeMap<TaskId, TaskInfo>,
    ready: VecDeque<TaskId>,
    terminal: usize,
}

impl<'g> Scheduler<'g> {
    /// Set up a run; tasks without predecessors are ready in id order.
    pub fn new(graph: &'g TaskGraph) -> Self {
        let mut tasks = BTreeMap::new();
        let mut ready = VecDeque::new();

        for task in graph.tasks() {
            let mut info = TaskInfo::new(task.id.clone(), task.dependencies.len());
            if info.unmet == 0 {
                info.state = TaskRunState::Ready;
                ready.push_back(task.id.clone());
            }
            tasks.insert(task.id.clone(), info);
        }

        debug!(tasks = tasks.len(), ready = ready.len(), "scheduler initialised");

        Self {
            graph,
            tasks,
            ready,
            terminal: 0,
        }
    }

    pub fn graph(&self) -> &'g TaskGraph {
        self.graph
    }

    pub fn state_of(&self, id: &TaskId) -> Option<TaskRunState> {
        self.tasks.get(id).map(|info| info.state)
    }

    /// Whether every task has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.terminal == self.tasks.len()
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Pop the next ready task and mark it running.
    pub fn next_ready(&mut self) -> Option<TaskId> {
        let id = self.ready.pop_front()?;
        if let Some(info) = self.tasks.get_mut(&id) {
            info.state = TaskRunState::Running;
        }
        Some(id)
    }

    /// Record that a running task finished.
    ///
    /// Completions for tasks that are not running are ignored.
    pub fn complete(&mut self, id: &TaskId, success: bool) -> SchedulerStep {
        match self.tasks.get_mut(id) {
            Some(info) if info.state == TaskRunState::Running => {
                info.state = if success {
                    TaskRunState::Succeeded
                } else {
                    TaskRunState::Failed
                };
            }
            Some(info) => {
                warn!(task = %id, state = ?info.state, "completion for task that is not running; ignoring");
                return self.step(Vec::new(), Vec::new());
            }
            None => {
                warn!(task = %id, "completion for unknown task; ignoring");
                return self.step(Vec::new(), Vec::new());
            }
        }
        self.terminal += 1;

        if success {
            let newly_ready = self.release_dependents(id);
            self.step(newly_ready, Vec::new())
        } else {
            let skipped = self.skip_dependents(id);
            self.step(Vec::new(), skipped)
        }
    }

    /// Stop the run: every task not yet dispatched becomes skipped.
    ///
    /// Running tasks are left alone; their completions are still accepted.
    pub fn cancel(&mut self) -> SchedulerStep {
        self.ready.clear();

        let mut skipped = Vec::new();
        for info in self.tasks.values_mut() {
            if matches!(info.state, TaskRunState::Pending | TaskRunState::Ready) {
                info.state = TaskRunState::Skipped;
                skipped.push((info.id.clone(), SkipReason::Cancelled));
            }
        }
        self.terminal += skipped.len();

        debug!(skipped = skipped.len(), "scheduler: run cancelled");
        self.step(Vec::new(), skipped)
    }

    /// Decrement the direct dependents of a succeeded task and enqueue those
    /// with no unmet predecessors left.
    fn release_dependents(&mut self, id: &TaskId) -> Vec<TaskId> {
        let graph = self.graph;
        let mut newly_ready = Vec::new();

        // `dependents_of` is sorted, so simultaneous releases are enqueued by id.
        for dependent in graph.dependents_of(id) {
            let Some(info) = self.tasks.get_mut(dependent) else {
                continue;
            };
            if info.state != TaskRunState::Pending {
                continue;
            }
            info.unmet = info.unmet.saturating_sub(1);
            if info.unmet == 0 {
                info.state = TaskRunState::Ready;
                debug!(task = %dependent, "dependencies satisfied; marking Ready");
                self.ready.push_back(dependent.clone());
                newly_ready.push(dependent.clone());
            }
        }

        newly_ready
    }

    /// Skip every pending transitive dependent of a failed task.
    fn skip_dependents(&mut self, failed: &TaskId) -> Vec<(TaskId, SkipReason)> {
        let mut skipped = Vec::new();

        for dependent in self.graph.transitive_dependents(failed) {
            if let Some(info) = self.tasks.get_mut(&dependent) {
                if info.state == TaskRunState::Pending {
                    info.state = TaskRunState::Skipped;
                    debug!(
                        task = %dependent,
                        cause = %failed,
                        "marking dependent as Skipped due to upstream failure"
                    );
                    skipped.push((
                        dependent,
                        SkipReason::UpstreamFailed {
                            cause: failed.clone(),
                        },
                    ));
                }
            }
        }
        self.terminal += skipped.len();

        skipped
    }

    fn step(
        &self,
        newly_ready: Vec<TaskId>,
        newly_skipped: Vec<(TaskId, SkipReason)>,
    ) -> SchedulerStep {
        SchedulerStep {
            newly_ready,
            newly_skipped,
            run_finished: self.is_finished(),
        }
    }
}
