// src/inventory.rs

//! Read-only input to the graph builder: hosts, roles and service templates.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dag::task::{Action, ID_SEPARATOR};

/// Host name standing for "every host the service is deployed on".
pub const ANY_HOST: &str = "*";

/// Roles assigned to one host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Services making up one role, in deployment order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    #[serde(default)]
    pub services: Vec<String>,
}

/// Reference from a task template to another task.
///
/// Written as a `/`-separated string; the number of segments decides the
/// scope:
///
/// - `"install"`: task of the same service on the same host
/// - `"mariadb/start"`: task of another service on the same host
/// - `"db-1/mariadb/start"`: task on a specific host
/// - `"*/mariadb/start"`: that task on every host running `mariadb`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DependencyRef {
    Local { action: String },
    SameHost { service: String, action: String },
    Host { host: String, service: String, action: String },
    AnyHost { service: String, action: String },
}

impl TryFrom<String> for DependencyRef {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let parts: Vec<&str> = raw.split(ID_SEPARATOR).collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(format!("invalid dependency reference '{raw}': empty segment"));
        }

        let owned = |s: &str| s.to_string();
        match parts.as_slice() {
            [action] => Ok(DependencyRef::Local {
                action: owned(action),
            }),
            [service, action] => Ok(DependencyRef::SameHost {
                service: owned(service),
                action: owned(action),
            }),
            [host, service, action] if *host == ANY_HOST => Ok(DependencyRef::AnyHost {
                service: owned(service),
                action: owned(action),
            }),
            [host, service, action] => Ok(DependencyRef::Host {
                host: owned(host),
                service: owned(service),
                action: owned(action),
            }),
            _ => Err(format!(
                "invalid dependency reference '{raw}': expected at most 3 '/'-separated parts"
            )),
        }
    }
}

impl From<DependencyRef> for String {
    fn from(r: DependencyRef) -> Self {
        r.to_string()
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyRef::Local { action } => write!(f, "{action}"),
            DependencyRef::SameHost { service, action } => write!(f, "{service}/{action}"),
            DependencyRef::Host {
                host,
                service,
                action,
            } => write!(f, "{host}/{service}/{action}"),
            DependencyRef::AnyHost { service, action } => {
                write!(f, "{ANY_HOST}/{service}/{action}")
            }
        }
    }
}

/// One task template inside a service definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// Action name, unique within the service (e.g. `"install"`).
    pub id: String,

    /// Explicit predecessors.
    #[serde(default)]
    pub requires: Vec<DependencyRef>,

    #[serde(flatten)]
    pub action: Action,
}

/// A deployable service: an ordered set of task templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub id: String,

    #[serde(default)]
    pub version: Option<String>,

    /// Services that must complete first when deployed on the same host.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub tasks: Vec<TaskTemplate>,
}

impl ServiceDefinition {
    pub fn template(&self, action: &str) -> Option<&TaskTemplate> {
        self.tasks.iter().find(|t| t.id == action)
    }
}

/// Snapshot of everything the builder needs for one graph build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryContext {
    pub hosts: BTreeMap<String, HostEntry>,
    pub roles: BTreeMap<String, RoleEntry>,
    pub services: BTreeMap<String, ServiceDefinition>,
}
