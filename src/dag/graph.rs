// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::task::{Task, TaskId};
use crate::errors::{Result, TaskCoreError};

/// Validated, immutable task DAG.
///
/// Only obtainable through [`TaskGraph::from_tasks`] (directly or via the
/// builder), so every predecessor exists and there are no cycles.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskId, Task>,
    /// Direct dependents: tasks that list the key among their dependencies.
    dependents: BTreeMap<TaskId, Vec<TaskId>>,
    /// Deterministic topological order.
    order: Vec<TaskId>,
}

impl TaskGraph {
    /// Validate a set of tasks and turn it into a graph.
    ///
    /// Fails with `ResolutionError` on duplicate ids or unknown predecessors,
    /// and with `DagCycle` listing exactly the tasks that sit on a cycle.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Result<Self> {
        let mut by_id: BTreeMap<TaskId, Task> = BTreeMap::new();
        for task in tasks {
            if by_id.contains_key(&task.id) {
                return Err(TaskCoreError::resolution(format!(
                    "duplicate task id '{}'",
                    task.id
                )));
            }
            by_id.insert(task.id.clone(), task);
        }

        for task in by_id.values() {
            if let Some(missing) = task.dependencies.iter().find(|d| !by_id.contains_key(*d)) {
                return Err(TaskCoreError::resolution(format!(
                    "task '{}' depends on unknown task '{}'",
                    task.id, missing
                )));
            }
        }

        let order = topological_order(&by_id)?;

        let mut dependents: BTreeMap<TaskId, Vec<TaskId>> =
            by_id.keys().map(|id| (id.clone(), Vec::new())).collect();
        // Iterating in id order keeps each dependents list sorted.
        for task in by_id.values() {
            for dep in &task.dependencies {
                if let Some(list) = dependents.get_mut(dep) {
                    list.push(task.id.clone());
                }
            }
        }

        debug!(tasks = by_id.len(), "task graph validated");

        Ok(Self {
            tasks: by_id,
            dependents,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// All tasks, ordered by id.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.tasks.keys()
    }

    /// Immediate predecessors of a task.
    pub fn dependencies_of(&self, id: &TaskId) -> Option<&BTreeSet<TaskId>> {
        self.tasks.get(id).map(|t| &t.dependencies)
    }

    /// Immediate dependents of a task, sorted by id.
    pub fn dependents_of(&self, id: &TaskId) -> &[TaskId] {
        self.dependents
            .get(id)
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks without predecessors, sorted by id.
    pub fn roots(&self) -> impl Iterator<Item = &TaskId> {
        self.tasks
            .values()
            .filter(|t| t.dependencies.is_empty())
            .map(|t| &t.id)
    }

    /// `(predecessor, dependent)` pairs, grouped by dependent in id order.
    pub fn edges(&self) -> impl Iterator<Item = (&TaskId, &TaskId)> {
        self.tasks
            .values()
            .flat_map(|t| t.dependencies.iter().map(move |dep| (dep, &t.id)))
    }

    pub fn edge_count(&self) -> usize {
        self.tasks.values().map(|t| t.dependencies.len()).sum()
    }

    pub fn topological_order(&self) -> &[TaskId] {
        &self.order
    }

    /// Every task reachable from `id` through dependent edges (excluding `id`).
    pub fn transitive_dependents(&self, id: &TaskId) -> BTreeSet<TaskId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&TaskId> = self.dependents_of(id).iter().collect();
        while let Some(next) = stack.pop() {
            if seen.insert(next.clone()) {
                stack.extend(self.dependents_of(next));
            }
        }
        seen
    }
}

/// Topologically sort the tasks, reporting cycle members on failure.
///
/// Edge direction: dependency -> dependent.
fn topological_order(tasks: &BTreeMap<TaskId, Task>) -> Result<Vec<TaskId>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in tasks.keys() {
        graph.add_node(id.as_str());
    }
    for task in tasks.values() {
        for dep in &task.dependencies {
            graph.add_edge(dep.as_str(), task.id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(TaskId::from).collect()),
        Err(_) => Err(TaskCoreError::DagCycle {
            tasks: cycle_members(&graph),
        }),
    }
}

/// Tasks on a cycle: members of non-trivial strongly connected components,
/// plus self-loops.
fn cycle_members(graph: &DiGraphMap<&str, ()>) -> Vec<TaskId> {
    let mut members: Vec<TaskId> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .map(TaskId::from)
        .collect();
    members.sort();
    members
}
