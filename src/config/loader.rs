// src/config/loader.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::model::{InventoryFile, RolesFile};
use crate::errors::{Result, TaskCoreError};
use crate::fs::FileSystem;
use crate::inventory::{InventoryContext, ServiceDefinition};

/// Extension of service definition files inside the services directory.
pub const SERVICE_FILE_EXTENSION: &str = "toml";

/// Parse a single service definition from TOML text.
pub fn parse_service(contents: &str) -> Result<ServiceDefinition> {
    Ok(toml::from_str(contents)?)
}

/// Load the three inputs of a graph build and assemble an [`InventoryContext`].
///
/// - `services_dir`: every `*.toml` file (sorted by path) is one service.
/// - `inventory_file`: hosts and their roles.
/// - `roles_file`: roles and their services.
///
/// This only checks what the files themselves can get wrong (unreadable or
/// malformed files, duplicate service ids). Reference resolution happens in
/// the graph builder.
pub fn load_context(
    fs: &dyn FileSystem,
    services_dir: &Path,
    inventory_file: &Path,
    roles_file: &Path,
) -> Result<InventoryContext> {
    let inventory: InventoryFile = load_toml(fs, inventory_file, "inventory")?;
    let roles: RolesFile = load_toml(fs, roles_file, "roles")?;
    let services = load_services(fs, services_dir)?;

    info!(
        hosts = inventory.hosts.len(),
        roles = roles.roles.len(),
        services = services.len(),
        "inventory loaded"
    );

    Ok(InventoryContext {
        hosts: inventory.hosts,
        roles: roles.roles,
        services,
    })
}

/// Load every service definition in `dir`, keyed by service id.
pub fn load_services(
    fs: &dyn FileSystem,
    dir: &Path,
) -> Result<BTreeMap<String, ServiceDefinition>> {
    if !fs.is_dir(dir) {
        return Err(TaskCoreError::ConfigError(format!(
            "services path {:?} is not a directory",
            dir
        )));
    }

    let mut files: Vec<PathBuf> = fs
        .read_dir(dir)?
        .into_iter()
        .filter(|p| fs.is_file(p))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(SERVICE_FILE_EXTENSION))
        .collect();
    files.sort();

    let mut services: BTreeMap<String, ServiceDefinition> = BTreeMap::new();
    let mut origin: BTreeMap<String, PathBuf> = BTreeMap::new();

    for path in files {
        let contents = read(fs, &path, "service")?;
        let service = parse_service(&contents).map_err(|e| {
            TaskCoreError::ConfigError(format!("invalid service file {:?}: {}", path, e))
        })?;

        if let Some(first) = origin.get(&service.id) {
            return Err(TaskCoreError::ConfigError(format!(
                "duplicate service id '{}' in {:?} (already defined in {:?})",
                service.id, path, first
            )));
        }

        debug!(service = %service.id, path = ?path, tasks = service.tasks.len(), "service loaded");
        origin.insert(service.id.clone(), path);
        services.insert(service.id.clone(), service);
    }

    Ok(services)
}

fn load_toml<T: DeserializeOwned>(fs: &dyn FileSystem, path: &Path, what: &str) -> Result<T> {
    let contents = read(fs, path, what)?;
    toml::from_str(&contents)
        .map_err(|e| TaskCoreError::ConfigError(format!("invalid {what} file {:?}: {}", path, e)))
}

fn read(fs: &dyn FileSystem, path: &Path, what: &str) -> Result<String> {
    fs.read_to_string(path).map_err(|e| {
        TaskCoreError::ConfigError(format!("cannot read {what} file {:?}: {:#}", path, e))
    })
}
