// src/engine/core.rs

//! Pure core of one execution.
//!
//! [`CoreExecutor`] owns every piece of mutable run state: the scheduler
//! (unmet-dependency counters and ready queue), the in-flight count and the
//! outcome map. It consumes [`ExecEvent`]s and returns the tasks the IO shell
//! should dispatch next. It owns no channels and performs no IO, so tests
//! can step it by hand.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::dag::{Scheduler, SchedulerStep, TaskGraph, TaskId, TaskRunState};
use crate::engine::ExecEvent;
use crate::engine::result::TaskOutcome;

/// Decision returned by the core after handling one event.
#[derive(Debug, Clone, Default)]
pub struct CoreStep {
    /// Tasks to hand to workers now, in dispatch order.
    pub dispatch: Vec<TaskId>,
    /// Tasks whose outcome was recorded by this step.
    pub recorded: Vec<TaskId>,
    /// Every task is terminal and nothing is in flight.
    pub finished: bool,
}

#[derive(Debug)]
pub struct CoreExecutor<'g> {
    scheduler: Scheduler<'g>,
    max_parallelism: usize,
    in_flight: usize,
    cancelled: bool,
    outcomes: BTreeMap<TaskId, TaskOutcome>,
    timings: BTreeMap<TaskId, Duration>,
}

impl<'g> CoreExecutor<'g> {
    /// `max_parallelism` of zero is treated as one.
    pub fn new(graph: &'g TaskGraph, max_parallelism: usize) -> Self {
        if max_parallelism == 0 {
            warn!("max_parallelism of 0 requested; using 1");
        }

        Self {
            scheduler: Scheduler::new(graph),
            max_parallelism: max_parallelism.max(1),
            in_flight: 0,
            cancelled: false,
            outcomes: BTreeMap::new(),
            timings: BTreeMap::new(),
        }
    }

    pub fn max_parallelism(&self) -> usize {
        self.max_parallelism
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn is_finished(&self) -> bool {
        self.in_flight == 0 && self.scheduler.is_finished()
    }

    pub fn scheduler(&self) -> &Scheduler<'g> {
        &self.scheduler
    }

    pub fn outcome(&self, id: &TaskId) -> Option<&TaskOutcome> {
        self.outcomes.get(id)
    }

    pub fn timing(&self, id: &TaskId) -> Option<Duration> {
        self.timings.get(id).copied()
    }

    /// Dispatch the initially ready tasks.
    pub fn start(&mut self) -> CoreStep {
        CoreStep {
            dispatch: self.fill_slots(),
            recorded: Vec::new(),
            finished: self.is_finished(),
        }
    }

    /// Handle a single event, returning what the shell should do next.
    pub fn step(&mut self, event: ExecEvent) -> CoreStep {
        let recorded = match event {
            ExecEvent::TaskFinished {
                task,
                result,
                elapsed,
            } => self.on_task_finished(task, result.into(), elapsed),
            ExecEvent::CancelRequested => self.on_cancel(),
        };

        CoreStep {
            dispatch: self.fill_slots(),
            recorded,
            finished: self.is_finished(),
        }
    }

    /// Hand back the outcome and timing maps once the run is over.
    pub fn into_parts(self) -> (BTreeMap<TaskId, TaskOutcome>, BTreeMap<TaskId, Duration>) {
        (self.outcomes, self.timings)
    }

    fn on_task_finished(
        &mut self,
        task: TaskId,
        outcome: TaskOutcome,
        elapsed: Duration,
    ) -> Vec<TaskId> {
        if self.scheduler.state_of(&task) != Some(TaskRunState::Running) {
            warn!(task = %task, "completion for task that was not dispatched; ignoring");
            return Vec::new();
        }

        self.in_flight = self.in_flight.saturating_sub(1);
        let step = self.scheduler.complete(&task, outcome.is_success());

        self.timings.insert(task.clone(), elapsed);
        self.record(task.clone(), outcome);

        let mut recorded = vec![task];
        recorded.extend(self.record_skips(step));
        recorded
    }

    fn on_cancel(&mut self) -> Vec<TaskId> {
        if self.cancelled {
            return Vec::new();
        }
        self.cancelled = true;
        debug!(in_flight = self.in_flight, "cancellation requested; no further dispatch");

        let step = self.scheduler.cancel();
        self.record_skips(step)
    }

    fn record_skips(&mut self, step: SchedulerStep) -> Vec<TaskId> {
        step.newly_skipped
            .into_iter()
            .map(|(id, reason)| {
                self.record(id.clone(), TaskOutcome::Skipped { reason });
                id
            })
            .collect()
    }

    /// First recorded outcome wins.
    fn record(&mut self, id: TaskId, outcome: TaskOutcome) {
        self.outcomes.entry(id).or_insert(outcome);
    }

    fn fill_slots(&mut self) -> Vec<TaskId> {
        let mut dispatch = Vec::new();
        if self.cancelled {
            return dispatch;
        }

        while self.in_flight < self.max_parallelism {
            let Some(id) = self.scheduler.next_ready() else {
                break;
            };
            self.in_flight += 1;
            dispatch.push(id);
        }

        dispatch
    }
}
