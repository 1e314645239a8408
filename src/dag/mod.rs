// src/dag/mod.rs

//! Task graph construction and scheduling.
//!
//! - [`task`] defines task ids, the closed action set and the task record.
//! - [`builder`] expands hosts/roles/services into tasks and edges.
//! - [`graph`] holds the validated, immutable DAG.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   tasks are ready and which must be skipped.
//! - [`task_info`] and [`scheduler_step`] are the scheduler's state and
//!   step result types.
//! - [`export`] turns a graph into a node/edge export and renders it.

pub mod builder;
pub mod export;
pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod task;
pub mod task_info;

pub use builder::GraphBuilder;
pub use export::{ExportEdge, ExportNode, FileGraphRenderer, GraphExport, GraphRenderer, RenderFuture};
pub use graph::TaskGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task::{Action, CommandParams, PrintParams, Task, TaskId};
pub use task_info::TaskRunState;
