// src/dag/task.rs

//! Task identity, resolved action payloads and the task record itself.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Separator between the host, service and action parts of a [`TaskId`].
pub const ID_SEPARATOR: char = '/';

/// Stable task identifier: `"{host}/{service}/{action}"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(host: &str, service: &str, action: &str) -> Self {
        Self(format!(
            "{host}{ID_SEPARATOR}{service}{ID_SEPARATOR}{action}"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Parameters of a `print` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintParams {
    pub message: String,
}

/// Parameters of a `command` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandParams {
    /// Shell command line, run with `sh -c`.
    pub cmd: String,

    /// Extra environment variables for the child process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory; inherits the coordinator's when `None`.
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

/// The closed set of things a task can do.
///
/// In service files the variant is selected by the `action` key:
///
/// ```toml
/// [[tasks]]
/// id = "configure"
/// action = "command"
/// cmd = "echo configuring {host}"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Noop,
    Print(PrintParams),
    Command(CommandParams),
}

impl Action {
    /// Short name of the action kind, as written in service files.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Noop => "noop",
            Action::Print(_) => "print",
            Action::Command(_) => "command",
        }
    }

    /// Substitute `{host}`, `{service}` and `{task}` in every string parameter.
    pub(crate) fn resolve(&self, host: &str, service: &str, task: &str) -> Action {
        let fill = |s: &str| {
            s.replace("{host}", host)
                .replace("{service}", service)
                .replace("{task}", task)
        };

        match self {
            Action::Noop => Action::Noop,
            Action::Print(p) => Action::Print(PrintParams {
                message: fill(&p.message),
            }),
            Action::Command(c) => Action::Command(CommandParams {
                cmd: fill(&c.cmd),
                env: c
                    .env
                    .iter()
                    .map(|(k, v)| (k.clone(), fill(v)))
                    .collect(),
                workdir: c.workdir.as_ref().map(|p| PathBuf::from(fill(&p.to_string_lossy()))),
            }),
        }
    }
}

/// A single unit of deployment work bound to a host, a service and an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub host: String,
    pub service: String,
    /// Name of the service task template this was instantiated from.
    pub action: String,
    /// Fully resolved action payload.
    pub params: Action,
    /// Direct predecessors.
    pub dependencies: BTreeSet<TaskId>,
}

impl Task {
    pub fn new(host: &str, service: &str, action: &str, params: Action) -> Self {
        Self {
            id: TaskId::new(host, service, action),
            host: host.to_string(),
            service: service.to_string(),
            action: action.to_string(),
            params,
            dependencies: BTreeSet::new(),
        }
    }

    pub fn depends_on(mut self, dep: TaskId) -> Self {
        self.dependencies.insert(dep);
        self
    }
}
