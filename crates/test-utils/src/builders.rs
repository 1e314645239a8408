#![allow(dead_code)]

use std::collections::BTreeMap;

use task_core::dag::{Action, CommandParams, PrintParams};
use task_core::inventory::{
    DependencyRef, HostEntry, InventoryContext, RoleEntry, ServiceDefinition, TaskTemplate,
};

/// Builder for `InventoryContext` to simplify test setup.
#[derive(Debug, Default)]
pub struct InventoryBuilder {
    ctx: InventoryContext,
}

impl InventoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, name: &str, roles: &[&str]) -> Self {
        self.ctx.hosts.insert(
            name.to_string(),
            HostEntry {
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        );
        self
    }

    pub fn role(mut self, name: &str, services: &[&str]) -> Self {
        self.ctx.roles.insert(
            name.to_string(),
            RoleEntry {
                services: services.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    /// Register a service under its own id.
    pub fn service(mut self, service: ServiceBuilder) -> Self {
        let def = service.build();
        self.ctx.services.insert(def.id.clone(), def);
        self
    }

    /// Register a service under a key that may differ from its id.
    pub fn service_as(mut self, key: &str, service: ServiceBuilder) -> Self {
        self.ctx.services.insert(key.to_string(), service.build());
        self
    }

    pub fn build(self) -> InventoryContext {
        self.ctx
    }
}

/// Builder for `ServiceDefinition`.
#[derive(Debug)]
pub struct ServiceBuilder {
    def: ServiceDefinition,
}

impl ServiceBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            def: ServiceDefinition {
                id: id.to_string(),
                version: None,
                after: Vec::new(),
                tasks: Vec::new(),
            },
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.def.version = Some(version.to_string());
        self
    }

    pub fn after(mut self, service: &str) -> Self {
        self.def.after.push(service.to_string());
        self
    }

    pub fn task(mut self, template: TemplateBuilder) -> Self {
        self.def.tasks.push(template.build());
        self
    }

    /// Shorthand for a `noop` task with the given `requires`.
    pub fn noop(self, id: &str, requires: &[&str]) -> Self {
        let mut template = TemplateBuilder::noop(id);
        for r in requires {
            template = template.requires(r);
        }
        self.task(template)
    }

    pub fn build(self) -> ServiceDefinition {
        self.def
    }
}

/// Builder for `TaskTemplate`.
#[derive(Debug)]
pub struct TemplateBuilder {
    template: TaskTemplate,
}

impl TemplateBuilder {
    fn with_action(id: &str, action: Action) -> Self {
        Self {
            template: TaskTemplate {
                id: id.to_string(),
                requires: Vec::new(),
                action,
            },
        }
    }

    pub fn noop(id: &str) -> Self {
        Self::with_action(id, Action::Noop)
    }

    pub fn print(id: &str, message: &str) -> Self {
        Self::with_action(
            id,
            Action::Print(PrintParams {
                message: message.to_string(),
            }),
        )
    }

    pub fn command(id: &str, cmd: &str) -> Self {
        Self::with_action(
            id,
            Action::Command(CommandParams {
                cmd: cmd.to_string(),
                env: BTreeMap::new(),
                workdir: None,
            }),
        )
    }

    /// Add a dependency written the way service files write it
    /// (`action`, `service/action`, `host/service/action`, `*/service/action`).
    pub fn requires(mut self, reference: &str) -> Self {
        let parsed = DependencyRef::try_from(reference.to_string())
            .unwrap_or_else(|e| panic!("bad dependency reference in test: {e}"));
        self.template.requires.push(parsed);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        if let Action::Command(params) = &mut self.template.action {
            params.env.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn workdir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        if let Action::Command(params) = &mut self.template.action {
            params.workdir = Some(dir.into());
        }
        self
    }

    pub fn build(self) -> TaskTemplate {
        self.template
    }
}
