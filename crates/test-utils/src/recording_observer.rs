use std::sync::Mutex;
use std::time::Duration;

use task_core::dag::{Task, TaskGraph, TaskId};
use task_core::engine::{RunObserver, RunStatistics, TaskOutcome};

/// One notification received by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    GraphBuilt { tasks: usize },
    Started(TaskId),
    Finished(TaskId, &'static str),
    RunFinished { total: usize },
}

/// Observer that keeps every notification in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Observed>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Observed> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<TaskId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Observed::Started(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Vec<(TaskId, &'static str)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Observed::Finished(id, label) => Some((id, label)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Observed) {
        self.events.lock().unwrap().push(event);
    }
}

impl RunObserver for RecordingObserver {
    fn graph_built(&self, graph: &TaskGraph) {
        self.push(Observed::GraphBuilt { tasks: graph.len() });
    }

    fn task_started(&self, task: &Task) {
        self.push(Observed::Started(task.id.clone()));
    }

    fn task_finished(&self, task: &TaskId, outcome: &TaskOutcome, _elapsed: Option<Duration>) {
        self.push(Observed::Finished(task.clone(), outcome.label()));
    }

    fn run_finished(&self, stats: &RunStatistics) {
        self.push(Observed::RunFinished { total: stats.total });
    }
}
