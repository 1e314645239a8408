// src/exec/backend.rs

//! Pluggable action runner abstraction.
//!
//! The executor talks to an `ActionRunner` instead of spawning processes
//! itself. Production code uses [`ProcessRunner`](super::ProcessRunner);
//! tests can provide a runner that records dispatches and returns scripted
//! outcomes without touching the OS.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::dag::Task;
use crate::engine::{TaskFailure, TaskOutput};

/// Future returned by [`ActionRunner::run`].
pub type RunFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<TaskOutput, TaskFailure>> + Send + 'a>>;

/// Performs the action of a single task.
///
/// The returned future resolves to the task's output, or to a
/// [`TaskFailure`] describing why it failed. Runners never see the graph and
/// never decide what runs next.
pub trait ActionRunner: Send + Sync + 'static {
    fn run(&self, task: Task) -> RunFuture<'_>;
}

impl<R: ActionRunner + ?Sized> ActionRunner for Arc<R> {
    fn run(&self, task: Task) -> RunFuture<'_> {
        (**self).run(task)
    }
}
