// tests/property_scheduler.rs

mod common;
use crate::common::id;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use proptest::prelude::*;
use task_core::dag::{GraphBuilder, TaskGraph, TaskId};
use task_core::engine::{CoreExecutor, ExecEvent, TaskFailure, TaskOutput};
use task_core::inventory::InventoryContext;
use task_core_test_utils::{InventoryBuilder, ServiceBuilder};

// Strategy to generate a valid DAG as a single-host service.
// We ensure acyclicity by only allowing task N to depend on tasks 0..N-1.
fn dag_context_strategy(max_tasks: usize) -> impl Strategy<Value = (InventoryContext, usize)> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..4),
            num_tasks,
        )
        .prop_map(move |raw_deps| {
            let mut service = ServiceBuilder::new("svc");
            for (i, potential) in raw_deps.into_iter().enumerate() {
                let deps: BTreeSet<String> = if i == 0 {
                    BTreeSet::new()
                } else {
                    potential.into_iter().map(|d| task_name(d % i)).collect()
                };
                let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
                service = service.noop(&task_name(i), &deps);
            }
            let ctx = InventoryBuilder::new()
                .host("h", &["r"])
                .role("r", &["svc"])
                .service(service)
                .build();
            (ctx, num_tasks)
        })
    })
}

fn task_name(i: usize) -> String {
    format!("t{i:02}")
}

fn task_id(i: usize) -> TaskId {
    id(&format!("h/svc/{}", task_name(i)))
}

/// Drive the core synchronously. `lifo` picks the most recently dispatched
/// task to complete next, which reorders completions relative to FIFO.
fn simulate(
    graph: &TaskGraph,
    max_parallelism: usize,
    failing: &BTreeSet<TaskId>,
    lifo: bool,
) -> (BTreeMap<TaskId, &'static str>, usize) {
    let mut core = CoreExecutor::new(graph, max_parallelism);
    let mut in_flight: Vec<TaskId> = core.start().dispatch;
    let mut peak = in_flight.len();

    while !core.is_finished() {
        if in_flight.is_empty() {
            break;
        }
        let task = if lifo {
            in_flight.remove(in_flight.len() - 1)
        } else {
            in_flight.remove(0)
        };

        let result = if failing.contains(&task) {
            Err(TaskFailure::new("scripted"))
        } else {
            Ok(TaskOutput::default())
        };
        let step = core.step(ExecEvent::TaskFinished {
            task,
            result,
            elapsed: Duration::ZERO,
        });
        in_flight.extend(step.dispatch);
        peak = peak.max(in_flight.len());
    }

    let (outcomes, _) = core.into_parts();
    let labels = outcomes.iter().map(|(k, v)| (k.clone(), v.label())).collect();
    (labels, peak)
}

proptest! {
    #[test]
    fn builds_are_deterministic_and_acyclic((ctx, n) in dag_context_strategy(12)) {
        let first = GraphBuilder::build(&ctx).unwrap();
        let second = GraphBuilder::build(&ctx).unwrap();

        prop_assert_eq!(first.len(), n);
        prop_assert_eq!(first.topological_order(), second.topological_order());

        // Every edge points forward in the topological order.
        let position: BTreeMap<&TaskId, usize> = first
            .topological_order()
            .iter()
            .enumerate()
            .map(|(i, t)| (t, i))
            .collect();
        for (from, to) in first.edges() {
            prop_assert!(position[from] < position[to]);
        }
    }

    #[test]
    fn classification_independent_of_parallelism(
        (ctx, n) in dag_context_strategy(12),
        failing in proptest::collection::btree_set(0..12usize, 0..4),
        max in 2..6usize,
    ) {
        let graph = GraphBuilder::build(&ctx).unwrap();
        let failing: BTreeSet<TaskId> = failing.into_iter().filter(|i| *i < n).map(task_id).collect();

        let (serial, serial_peak) = simulate(&graph, 1, &failing, false);
        let (parallel, parallel_peak) = simulate(&graph, max, &failing, true);

        prop_assert_eq!(&serial, &parallel);
        prop_assert_eq!(serial.len(), n);
        prop_assert!(serial_peak <= 1);
        prop_assert!(parallel_peak <= max);
    }

    #[test]
    fn skips_match_reachability_from_failures(
        (ctx, n) in dag_context_strategy(12),
        failing in proptest::collection::btree_set(0..12usize, 0..4),
    ) {
        let graph = GraphBuilder::build(&ctx).unwrap();
        let failing: BTreeSet<TaskId> = failing.into_iter().filter(|i| *i < n).map(task_id).collect();

        let (labels, _) = simulate(&graph, 3, &failing, false);

        // Expected classification, walking the graph in topological order.
        let mut expected: BTreeMap<TaskId, &'static str> = BTreeMap::new();
        for task in graph.topological_order() {
            let blocked = graph
                .dependencies_of(task)
                .into_iter()
                .flatten()
                .any(|dep| expected[dep] != "succeeded");
            let label = if blocked {
                "skipped"
            } else if failing.contains(task) {
                "failed"
            } else {
                "succeeded"
            };
            expected.insert(task.clone(), label);
        }

        prop_assert_eq!(labels, expected);
    }
}
