// tests/process_runner.rs
//
// Runs real shell commands, so only on unix.
#![cfg(unix)]

mod common;
use crate::common::{id, init_tracing, with_timeout};

use std::collections::BTreeMap;
use std::sync::Arc;

use task_core::dag::{Action, CommandParams, PrintParams, Task, TaskGraph};
use task_core::engine::{Executor, TaskOutcome};
use task_core::exec::{ActionRunner, ProcessRunner};

fn command(cmd: &str) -> Action {
    Action::Command(CommandParams {
        cmd: cmd.to_string(),
        env: BTreeMap::new(),
        workdir: None,
    })
}

#[tokio::test]
async fn noop_and_print_succeed() {
    init_tracing();
    let runner = ProcessRunner::new();

    let out = runner
        .run(Task::new("h", "s", "n", Action::Noop))
        .await
        .unwrap();
    assert_eq!(out.exit_code, None);

    let out = runner
        .run(Task::new(
            "h",
            "s",
            "p",
            Action::Print(PrintParams {
                message: "hello".into(),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(out.stdout, "hello");
}

#[tokio::test]
async fn command_receives_task_environment() {
    let runner = ProcessRunner::new();
    let mut params = CommandParams {
        cmd: "echo $TASK_CORE_HOST $TASK_CORE_SERVICE $TASK_CORE_TASK $EXTRA".to_string(),
        env: BTreeMap::new(),
        workdir: None,
    };
    params.env.insert("EXTRA".into(), "42".into());

    let out = with_timeout(runner.run(Task::new("web-1", "nginx", "install", Action::Command(params))))
        .await
        .unwrap();

    assert_eq!(out.exit_code, Some(0));
    assert_eq!(out.stdout.trim(), "web-1 nginx web-1/nginx/install 42");
}

#[tokio::test]
async fn command_runs_in_workdir() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ProcessRunner::new();
    let params = CommandParams {
        cmd: "pwd".to_string(),
        env: BTreeMap::new(),
        workdir: Some(dir.path().to_path_buf()),
    };

    let out = with_timeout(runner.run(Task::new("h", "s", "pwd", Action::Command(params))))
        .await
        .unwrap();

    let expected = dir.path().canonicalize().unwrap();
    let actual = std::path::PathBuf::from(out.stdout.trim()).canonicalize().unwrap();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn non_zero_exit_is_a_failure_with_code() {
    let runner = ProcessRunner::new();

    let failure = with_timeout(runner.run(Task::new(
        "h",
        "s",
        "bad",
        command("echo broken >&2; exit 3"),
    )))
    .await
    .unwrap_err();

    assert_eq!(failure.exit_code, Some(3));
    assert!(failure.reason.contains("status 3"), "{}", failure.reason);
    assert!(failure.reason.contains("broken"), "{}", failure.reason);
}

#[tokio::test]
async fn missing_workdir_is_a_failure() {
    let runner = ProcessRunner::new();
    let params = CommandParams {
        cmd: "true".to_string(),
        env: BTreeMap::new(),
        workdir: Some("/definitely/not/here".into()),
    };

    let failure = with_timeout(runner.run(Task::new("h", "s", "x", Action::Command(params))))
        .await
        .unwrap_err();
    assert!(failure.reason.contains("spawning process"), "{}", failure.reason);
}

#[tokio::test]
async fn executor_runs_real_commands_end_to_end() {
    init_tracing();

    let graph = TaskGraph::from_tasks(vec![
        Task::new("h", "s", "a", command("true")),
        Task::new("h", "s", "b", command("exit 1")).depends_on(id("h/s/a")),
        Task::new("h", "s", "c", command("true")).depends_on(id("h/s/b")),
        Task::new("h", "s", "d", command("true")).depends_on(id("h/s/a")),
    ])
    .unwrap();

    let result = with_timeout(Executor::new(Arc::new(ProcessRunner::new())).execute(&graph, 2)).await;

    assert_eq!(
        result.classification(),
        [
            (id("h/s/a"), "succeeded"),
            (id("h/s/b"), "failed"),
            (id("h/s/c"), "skipped"),
            (id("h/s/d"), "succeeded"),
        ]
        .into_iter()
        .collect::<BTreeMap<_, _>>()
    );
    assert!(matches!(
        result.outcome(&id("h/s/b")),
        Some(TaskOutcome::Failed(f)) if f.exit_code == Some(1)
    ));
}
