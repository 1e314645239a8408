// src/exec/mod.rs

//! Action execution layer.
//!
//! - [`backend`] provides the `ActionRunner` trait the executor dispatches
//!   through; tests replace it with a scripted fake.
//! - [`process`] holds `ProcessRunner`, the production implementation.

pub mod backend;
pub mod process;

pub use backend::{ActionRunner, RunFuture};
pub use process::ProcessRunner;
