use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use task_core::dag::{Task, TaskId};
use task_core::engine::{TaskFailure, TaskOutput};
use task_core::exec::{ActionRunner, RunFuture};

/// A fake action runner that:
/// - records the order in which tasks were dispatched
/// - succeeds by default, or fails / panics for configured task ids
/// - optionally sleeps per task, to exercise concurrency
/// - tracks how many task bodies were running at the same time
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    fail: BTreeSet<TaskId>,
    panic: BTreeSet<TaskId>,
    delays: BTreeMap<TaskId, Duration>,
    default_delay: Duration,
    dispatched: Mutex<Vec<TaskId>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.fail.insert(TaskId::from(id));
        self
    }

    pub fn panicking(mut self, id: &str) -> Self {
        self.panic.insert(TaskId::from(id));
        self
    }

    pub fn delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(TaskId::from(id), delay);
        self
    }

    /// Delay applied to every task without a specific one.
    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Task ids in dispatch order.
    pub fn dispatched(&self) -> Vec<TaskId> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn was_dispatched(&self, id: &str) -> bool {
        self.dispatched.lock().unwrap().contains(&TaskId::from(id))
    }

    /// Highest number of task bodies observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl ActionRunner for ScriptedRunner {
    fn run(&self, task: Task) -> RunFuture<'_> {
        Box::pin(async move {
            self.dispatched.lock().unwrap().push(task.id.clone());

            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = self
                .delays
                .get(&task.id)
                .copied()
                .unwrap_or(self.default_delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            } else {
                tokio::task::yield_now().await;
            }

            self.running.fetch_sub(1, Ordering::SeqCst);

            if self.panic.contains(&task.id) {
                panic!("scripted panic in {}", task.id);
            }
            if self.fail.contains(&task.id) {
                return Err(TaskFailure::new(format!("scripted failure of {}", task.id))
                    .with_exit_code(1));
            }
            Ok(TaskOutput::with_stdout(task.id.to_string()))
        })
    }
}
