// tests/scheduler_core.rs
//
// Pure, synchronous tests of the scheduler and the executor core. No Tokio,
// no runner: completions are fed in by hand.

mod common;
use crate::common::{id, init_tracing, web_chain_context};

use std::time::Duration;

use task_core::dag::{Action, GraphBuilder, Scheduler, Task, TaskGraph, TaskRunState};
use task_core::engine::{CoreExecutor, ExecEvent, SkipReason, TaskFailure, TaskOutcome, TaskOutput};

/// a -> b -> d, a -> c, e independent.
fn diamond_graph() -> TaskGraph {
    let t = |name: &str| Task::new("h", "s", name, Action::Noop);
    TaskGraph::from_tasks(vec![
        t("a"),
        t("b").depends_on(id("h/s/a")),
        t("c").depends_on(id("h/s/a")),
        t("d").depends_on(id("h/s/b")),
        t("e"),
    ])
    .unwrap()
}

fn finished(task: &str, ok: bool) -> ExecEvent {
    ExecEvent::TaskFinished {
        task: id(task),
        result: if ok {
            Ok(TaskOutput::default())
        } else {
            Err(TaskFailure::new("boom").with_exit_code(2))
        },
        elapsed: Duration::from_millis(1),
    }
}

#[test]
fn initially_ready_tasks_are_in_id_order() {
    init_tracing();
    let graph = diamond_graph();
    let mut scheduler = Scheduler::new(&graph);

    assert_eq!(scheduler.ready_len(), 2);
    assert_eq!(scheduler.next_ready(), Some(id("h/s/a")));
    assert_eq!(scheduler.next_ready(), Some(id("h/s/e")));
    assert_eq!(scheduler.next_ready(), None);
    assert_eq!(scheduler.state_of(&id("h/s/a")), Some(TaskRunState::Running));
    assert_eq!(scheduler.state_of(&id("h/s/b")), Some(TaskRunState::Pending));
}

#[test]
fn success_releases_dependents_sorted_by_id() {
    let graph = diamond_graph();
    let mut scheduler = Scheduler::new(&graph);
    scheduler.next_ready();

    let step = scheduler.complete(&id("h/s/a"), true);
    assert_eq!(step.newly_ready, vec![id("h/s/b"), id("h/s/c")]);
    assert!(step.newly_skipped.is_empty());
    assert!(!step.run_finished);

    // `e` was ready first, then the released tasks follow.
    assert_eq!(scheduler.next_ready(), Some(id("h/s/e")));
    assert_eq!(scheduler.next_ready(), Some(id("h/s/b")));
}

#[test]
fn failure_skips_transitive_dependents_only() {
    let graph = diamond_graph();
    let mut scheduler = Scheduler::new(&graph);
    scheduler.next_ready(); // a
    scheduler.complete(&id("h/s/a"), true);
    scheduler.next_ready(); // e
    scheduler.next_ready(); // b

    let step = scheduler.complete(&id("h/s/b"), false);
    assert_eq!(
        step.newly_skipped,
        vec![(id("h/s/d"), SkipReason::UpstreamFailed { cause: id("h/s/b") })]
    );
    assert_eq!(scheduler.state_of(&id("h/s/c")), Some(TaskRunState::Ready));
    assert_eq!(scheduler.state_of(&id("h/s/d")), Some(TaskRunState::Skipped));
}

#[test]
fn completion_for_task_not_running_is_ignored() {
    let graph = diamond_graph();
    let mut scheduler = Scheduler::new(&graph);

    let step = scheduler.complete(&id("h/s/b"), true);
    assert!(step.newly_ready.is_empty());
    assert_eq!(scheduler.state_of(&id("h/s/b")), Some(TaskRunState::Pending));

    let step = scheduler.complete(&id("nope/x/y"), false);
    assert!(step.newly_skipped.is_empty());
}

#[test]
fn cancel_skips_everything_not_dispatched() {
    let graph = diamond_graph();
    let mut scheduler = Scheduler::new(&graph);
    scheduler.next_ready(); // a running

    let step = scheduler.cancel();
    let skipped: Vec<_> = step.newly_skipped.iter().map(|(t, _)| t.clone()).collect();
    assert_eq!(skipped, vec![id("h/s/b"), id("h/s/c"), id("h/s/d"), id("h/s/e")]);
    assert!(step.newly_skipped.iter().all(|(_, r)| *r == SkipReason::Cancelled));
    assert!(!scheduler.is_finished());

    // The running task still reports in.
    let step = scheduler.complete(&id("h/s/a"), true);
    assert!(step.newly_ready.is_empty());
    assert!(step.run_finished);
}

#[test]
fn core_respects_parallelism_limit() {
    let graph = diamond_graph();
    let mut core = CoreExecutor::new(&graph, 1);

    let step = core.start();
    assert_eq!(step.dispatch, vec![id("h/s/a")]);
    assert_eq!(core.in_flight(), 1);

    let step = core.step(finished("h/s/a", true));
    assert_eq!(step.recorded, vec![id("h/s/a")]);
    assert_eq!(step.dispatch, vec![id("h/s/e")]);
    assert_eq!(core.in_flight(), 1);
}

#[test]
fn zero_parallelism_is_treated_as_one() {
    let graph = diamond_graph();
    let mut core = CoreExecutor::new(&graph, 0);
    assert_eq!(core.max_parallelism(), 1);
    assert_eq!(core.start().dispatch.len(), 1);
}

#[test]
fn core_drives_chain_to_completion() {
    let ctx = web_chain_context();
    let graph = GraphBuilder::build(&ctx).unwrap();
    let mut core = CoreExecutor::new(&graph, 5);

    let mut order = Vec::new();
    let mut pending = core.start().dispatch;
    while let Some(next) = pending.pop() {
        order.push(next.clone());
        let step = core.step(finished(next.as_str(), true));
        pending.extend(step.dispatch);
        if step.finished {
            break;
        }
    }

    assert!(core.is_finished());
    assert_eq!(order, graph.topological_order());
    let (outcomes, timings) = core.into_parts();
    assert!(outcomes.values().all(TaskOutcome::is_success));
    assert_eq!(timings.len(), 3);
}

#[test]
fn core_records_failure_and_skips() {
    let graph = diamond_graph();
    let mut core = CoreExecutor::new(&graph, 5);
    core.start(); // a, e

    let step = core.step(finished("h/s/a", false));
    assert_eq!(
        step.recorded,
        vec![id("h/s/a"), id("h/s/b"), id("h/s/c"), id("h/s/d")]
    );
    assert!(step.dispatch.is_empty());
    assert!(!step.finished);

    let step = core.step(finished("h/s/e", true));
    assert!(step.finished);

    match core.outcome(&id("h/s/a")) {
        Some(TaskOutcome::Failed(f)) => assert_eq!(f.exit_code, Some(2)),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        core.outcome(&id("h/s/d")),
        Some(&TaskOutcome::Skipped {
            reason: SkipReason::UpstreamFailed { cause: id("h/s/a") }
        })
    );
    assert!(core.timing(&id("h/s/d")).is_none());
}

#[test]
fn cancel_stops_dispatch_but_accepts_in_flight_results() {
    let graph = diamond_graph();
    let mut core = CoreExecutor::new(&graph, 5);
    core.start(); // a, e in flight

    let step = core.step(ExecEvent::CancelRequested);
    assert!(core.is_cancelled());
    assert!(step.dispatch.is_empty());
    assert_eq!(step.recorded, vec![id("h/s/b"), id("h/s/c"), id("h/s/d")]);

    // A failure after cancellation does not change cancelled dependents.
    core.step(finished("h/s/a", false));
    let step = core.step(finished("h/s/e", true));
    assert!(step.finished);
    assert_eq!(
        core.outcome(&id("h/s/b")),
        Some(&TaskOutcome::Skipped {
            reason: SkipReason::Cancelled
        })
    );
    assert!(core.outcome(&id("h/s/a")).is_some_and(TaskOutcome::is_failure));
}

#[test]
fn duplicate_completion_is_ignored() {
    let graph = diamond_graph();
    let mut core = CoreExecutor::new(&graph, 5);
    core.start();

    core.step(finished("h/s/a", true));
    let step = core.step(finished("h/s/a", false));
    assert!(step.recorded.is_empty());
    assert!(core.outcome(&id("h/s/a")).is_some_and(TaskOutcome::is_success));
}

#[test]
fn empty_graph_is_finished_at_start() {
    let graph = TaskGraph::from_tasks(Vec::new()).unwrap();
    let mut core = CoreExecutor::new(&graph, 5);
    let step = core.start();
    assert!(step.finished);
    assert!(step.dispatch.is_empty());
}
