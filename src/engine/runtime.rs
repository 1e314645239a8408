// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dag::{Task, TaskGraph, TaskId};
use crate::engine::core::{CoreExecutor, CoreStep};
use crate::engine::observer::{RunObserver, TracingObserver};
use crate::engine::result::{RunResult, RunStatistics, TaskFailure};
use crate::engine::ExecEvent;
use crate::exec::ActionRunner;

/// Capacity of the completion channel between workers and the loop.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Executes a [`TaskGraph`] with bounded parallelism.
///
/// This is the async IO shell around [`CoreExecutor`], which holds all the
/// scheduling semantics. The shell spawns task bodies on the Tokio runtime,
/// waits for their completion events and feeds them back into the core.
pub struct Executor<R: ActionRunner> {
    runner: Arc<R>,
    observer: Arc<dyn RunObserver>,
    cancel: CancellationToken,
}

impl<R: ActionRunner> fmt::Debug for Executor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<R: ActionRunner> Executor<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self {
            runner,
            observer: Arc::new(TracingObserver),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Use a caller-owned token; cancelling it stops further dispatch.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every task of `graph`, honouring dependencies.
    ///
    /// Never fails as a whole: task failures, panics and cancellation all
    /// end up as per-task outcomes in the returned [`RunResult`].
    pub async fn execute(&self, graph: &TaskGraph, max_parallelism: usize) -> RunResult {
        let started_at = Utc::now();
        let clock = Instant::now();

        let mut core = CoreExecutor::new(graph, max_parallelism);
        let (tx, mut rx) = mpsc::channel::<ExecEvent>(EVENT_CHANNEL_CAPACITY);

        info!(
            tasks = graph.len(),
            max_parallelism = core.max_parallelism(),
            "executor started"
        );

        let mut cancel_seen = self.cancel.is_cancelled();
        let step = if cancel_seen {
            info!("run cancelled before dispatch");
            core.step(ExecEvent::CancelRequested)
        } else {
            core.start()
        };
        self.apply(graph, &core, step, &tx);

        while !core.is_finished() {
            if core.in_flight() == 0 {
                // Nothing can report back; only reachable if the core wedged.
                error!("no task in flight but run not finished; cancelling remaining tasks");
                let step = core.step(ExecEvent::CancelRequested);
                self.apply(graph, &core, step, &tx);
                if !core.is_finished() {
                    break;
                }
                continue;
            }

            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled(), if !cancel_seen => {
                    cancel_seen = true;
                    info!(in_flight = core.in_flight(), "run cancelled; waiting for in-flight tasks");
                    ExecEvent::CancelRequested
                }
                received = rx.recv() => match received {
                    Some(event) => event,
                    None => {
                        // The loop holds a sender, so this cannot happen.
                        warn!("executor event channel closed unexpectedly");
                        break;
                    }
                },
            };

            debug!(?event, "executor received event");
            let step = core.step(event);
            self.apply(graph, &core, step, &tx);
        }

        drop(tx);

        let (outcomes, timings) = core.into_parts();
        let stats = RunStatistics::tally(outcomes.values(), started_at, clock);
        self.observer.run_finished(&stats);

        RunResult {
            outcomes,
            timings,
            stats,
        }
    }

    /// Notify the observer about recorded outcomes and spawn dispatched tasks.
    fn apply(
        &self,
        graph: &TaskGraph,
        core: &CoreExecutor<'_>,
        step: CoreStep,
        tx: &mpsc::Sender<ExecEvent>,
    ) {
        for id in &step.recorded {
            if let Some(outcome) = core.outcome(id) {
                self.observer.task_finished(id, outcome, core.timing(id));
            }
        }

        for id in step.dispatch {
            let Some(task) = graph.get(&id) else {
                // Ids come from the graph itself.
                continue;
            };
            self.observer.task_started(task);
            self.spawn_task(id, task.clone(), tx.clone());
        }
    }

    fn spawn_task(&self, id: TaskId, task: Task, tx: mpsc::Sender<ExecEvent>) {
        let runner = Arc::clone(&self.runner);

        tokio::spawn(async move {
            let start = Instant::now();

            // The body runs in its own task so a panic surfaces as a JoinError.
            let body = tokio::spawn(async move { runner.run(task).await });
            let result = match body.await {
                Ok(result) => result,
                Err(err) if err.is_panic() => {
                    error!(task = %id, "task body panicked");
                    Err(TaskFailure::new(format!("task panicked: {}", panic_message(err))))
                }
                Err(err) => Err(TaskFailure::new(format!("task aborted: {err}"))),
            };

            let elapsed: Duration = start.elapsed();
            if tx
                .send(ExecEvent::TaskFinished {
                    task: id.clone(),
                    result,
                    elapsed,
                })
                .await
                .is_err()
            {
                warn!(task = %id, "executor gone before task completion was delivered");
            }
        });
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
