// src/dag/builder.rs

//! Translation of hosts/roles/services into a [`TaskGraph`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::dag::graph::TaskGraph;
use crate::dag::task::{Action, ID_SEPARATOR, Task, TaskId};
use crate::errors::{Result, TaskCoreError};
use crate::inventory::{ANY_HOST, DependencyRef, InventoryContext, ServiceDefinition, TaskTemplate};

/// Builds task graphs from an [`InventoryContext`].
///
/// The builder only reads the context; the same context always produces the
/// same task ids and edges.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder<'a> {
    ctx: &'a InventoryContext,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(ctx: &'a InventoryContext) -> Self {
        Self { ctx }
    }

    /// Convenience for `GraphBuilder::new(ctx).build_graph()`.
    pub fn build(ctx: &'a InventoryContext) -> Result<TaskGraph> {
        Self::new(ctx).build_graph()
    }

    pub fn build_graph(&self) -> Result<TaskGraph> {
        let placement = self.expand_hosts()?;

        let deployed: BTreeSet<&str> = placement
            .values()
            .flat_map(|services| services.iter().copied())
            .collect();
        for service in &deployed {
            self.validate_service(service)?;
        }

        let mut tasks = Vec::new();
        for (host, services) in &placement {
            for service in services {
                let def = self.service(service)?;
                for template in &def.tasks {
                    tasks.push(self.instantiate(&placement, host, def, template)?);
                }
            }
        }

        let graph = TaskGraph::from_tasks(tasks)?;
        info!(
            hosts = placement.len(),
            tasks = graph.len(),
            edges = graph.edge_count(),
            "task graph built"
        );
        Ok(graph)
    }

    /// Host -> ordered, de-duplicated services deployed on it.
    fn expand_hosts(&self) -> Result<BTreeMap<&'a str, Vec<&'a str>>> {
        let mut placement = BTreeMap::new();

        for (host, entry) in &self.ctx.hosts {
            validate_name("host", host)?;

            let mut services: Vec<&str> = Vec::new();
            for role in &entry.roles {
                validate_name("role", role)?;
                let role_def = self.ctx.roles.get(role).ok_or_else(|| {
                    TaskCoreError::resolution(format!(
                        "host '{host}' references undefined role '{role}'"
                    ))
                })?;

                for service in &role_def.services {
                    if !self.ctx.services.contains_key(service) {
                        return Err(TaskCoreError::resolution(format!(
                            "role '{role}' references undefined service '{service}'"
                        )));
                    }
                    if services.contains(&service.as_str()) {
                        debug!(host = %host, service = %service, "service already placed on host; collapsing");
                        continue;
                    }
                    services.push(service.as_str());
                }
            }

            placement.insert(host.as_str(), services);
        }

        Ok(placement)
    }

    fn service(&self, name: &str) -> Result<&'a ServiceDefinition> {
        self.ctx.services.get(name).ok_or_else(|| {
            TaskCoreError::resolution(format!("undefined service '{name}'"))
        })
    }

    fn validate_service(&self, name: &str) -> Result<()> {
        let def = self.service(name)?;
        validate_name("service", &def.id)?;

        if def.id != name {
            return Err(TaskCoreError::resolution(format!(
                "service registered as '{name}' declares id '{}'",
                def.id
            )));
        }
        if def.tasks.is_empty() {
            return Err(TaskCoreError::resolution(format!(
                "service '{name}' defines no tasks"
            )));
        }

        let mut seen = BTreeSet::new();
        for template in &def.tasks {
            validate_name("task", &template.id)?;
            if !seen.insert(template.id.as_str()) {
                return Err(TaskCoreError::resolution(format!(
                    "service '{name}' defines task '{}' more than once",
                    template.id
                )));
            }
            if let Action::Command(params) = &template.action {
                if params.cmd.trim().is_empty() {
                    return Err(TaskCoreError::resolution(format!(
                        "service '{name}' task '{}' has an empty command",
                        template.id
                    )));
                }
            }
        }

        for other in &def.after {
            if !self.ctx.services.contains_key(other) {
                return Err(TaskCoreError::resolution(format!(
                    "service '{name}' must follow undefined service '{other}'"
                )));
            }
        }

        Ok(())
    }

    fn instantiate(
        &self,
        placement: &BTreeMap<&'a str, Vec<&'a str>>,
        host: &str,
        def: &ServiceDefinition,
        template: &TaskTemplate,
    ) -> Result<Task> {
        let params = template.action.resolve(host, &def.id, &template.id);
        let mut task = Task::new(host, &def.id, &template.id, params);

        for reference in &template.requires {
            let resolved = self.resolve_reference(placement, host, def, reference)?;
            task.dependencies.extend(resolved);
        }

        // Same-host ordering between services; no implicit cross-host edges.
        let on_host = placement.get(host).map(Vec::as_slice).unwrap_or(&[]);
        for predecessor in &def.after {
            if !on_host.contains(&predecessor.as_str()) {
                continue;
            }
            let pre_def = self.service(predecessor)?;
            task.dependencies.extend(
                pre_def
                    .tasks
                    .iter()
                    .map(|t| TaskId::new(host, &pre_def.id, &t.id)),
            );
        }

        Ok(task)
    }

    fn resolve_reference(
        &self,
        placement: &BTreeMap<&'a str, Vec<&'a str>>,
        host: &str,
        def: &ServiceDefinition,
        reference: &DependencyRef,
    ) -> Result<Vec<TaskId>> {
        let unresolved = |why: &str| {
            TaskCoreError::resolution(format!(
                "host '{host}' service '{}': cannot resolve dependency '{reference}': {why}",
                def.id
            ))
        };

        let (hosts, service, action): (Vec<&str>, &str, &str) = match reference {
            DependencyRef::Local { action } => (vec![host], def.id.as_str(), action.as_str()),
            DependencyRef::SameHost { service, action } => {
                (vec![host], service.as_str(), action.as_str())
            }
            DependencyRef::Host {
                host: target,
                service,
                action,
            } => {
                if !self.ctx.hosts.contains_key(target) {
                    return Err(unresolved("unknown host"));
                }
                (vec![target.as_str()], service.as_str(), action.as_str())
            }
            DependencyRef::AnyHost { service, action } => {
                let hosts: Vec<&str> = placement
                    .iter()
                    .filter(|(_, services)| services.contains(&service.as_str()))
                    .map(|(h, _)| *h)
                    .collect();
                if hosts.is_empty() {
                    return Err(unresolved("service is not deployed on any host"));
                }
                (hosts, service.as_str(), action.as_str())
            }
        };

        let target_def = self
            .ctx
            .services
            .get(service)
            .ok_or_else(|| unresolved("undefined service"))?;
        if target_def.template(action).is_none() {
            return Err(unresolved("service has no such task"));
        }

        let mut ids = Vec::with_capacity(hosts.len());
        for target_host in hosts {
            let placed = placement
                .get(target_host)
                .is_some_and(|services| services.contains(&service));
            if !placed {
                return Err(unresolved(&format!(
                    "service '{service}' is not deployed on host '{target_host}'"
                )));
            }
            ids.push(TaskId::new(target_host, service, action));
        }

        Ok(ids)
    }
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TaskCoreError::resolution(format!("{kind} name must not be empty")));
    }
    if name.contains(ID_SEPARATOR) || name == ANY_HOST {
        return Err(TaskCoreError::resolution(format!(
            "{kind} name '{name}' must not contain '{ID_SEPARATOR}' or be '{ANY_HOST}'"
        )));
    }
    Ok(())
}
