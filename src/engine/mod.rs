// src/engine/mod.rs

//! Execution engine for task graphs.
//!
//! The pure core state machine lives in [`core`]: it owns the scheduler and
//! the outcome map and turns completion events into dispatch decisions.
//! The async/IO shell in [`runtime`] spawns task bodies and feeds their
//! completions back into the core. [`coordinator`] drives one end-to-end
//! invocation (build, then execute or export).

use std::time::Duration;

use crate::dag::TaskId;

/// Default size of the worker pool.
pub const DEFAULT_MAX_PARALLELISM: usize = 5;

/// Execution settings supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Upper bound on concurrently running task bodies.
    pub max_parallelism: usize,
    /// Build and export the graph without executing it.
    pub dry_run: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_parallelism: DEFAULT_MAX_PARALLELISM,
            dry_run: false,
        }
    }
}

/// Events flowing into the core from workers and the caller.
#[derive(Debug, Clone)]
pub enum ExecEvent {
    /// A dispatched task body returned.
    TaskFinished {
        task: TaskId,
        result: Result<TaskOutput, TaskFailure>,
        elapsed: Duration,
    },
    /// The caller asked to stop dispatching.
    CancelRequested,
}

pub mod coordinator;
pub mod core;
pub mod observer;
pub mod result;
pub mod runtime;

pub use coordinator::RunCoordinator;
pub use core::{CoreExecutor, CoreStep};
pub use observer::{RunObserver, TracingObserver};
pub use result::{RunResult, RunStatistics, SkipReason, TaskFailure, TaskOutcome, TaskOutput};
pub use runtime::Executor;
