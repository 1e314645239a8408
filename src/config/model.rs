// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::inventory::{HostEntry, RoleEntry};

/// Inventory file: which roles each host plays.
///
/// ```toml
/// [hosts.web-1]
/// roles = ["base", "web"]
///
/// [hosts.db-1]
/// roles = ["base", "db"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryFile {
    #[serde(default)]
    pub hosts: BTreeMap<String, HostEntry>,
}

/// Roles file: one table per role, listing its services.
///
/// ```toml
/// [web]
/// services = ["install", "configure"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RolesFile {
    pub roles: BTreeMap<String, RoleEntry>,
}
