// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::dag::TaskId;

#[derive(Error, Debug)]
pub enum TaskCoreError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Resolution error: {0}")]
    ResolutionError(String),

    #[error("Cycle detected in task graph among: {}", join_ids(.tasks))]
    DagCycle { tasks: Vec<TaskId> },

    #[error("Graph export unavailable: {0}")]
    GraphExportUnavailable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskCoreError {
    /// Whether this error comes from the graph build phase (nothing ran).
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            TaskCoreError::ResolutionError(_) | TaskCoreError::DagCycle { .. }
        )
    }

    pub(crate) fn resolution(msg: impl Into<String>) -> Self {
        TaskCoreError::ResolutionError(msg.into())
    }
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, TaskCoreError>;
