// tests/config_loader.rs

mod common;
use crate::common::{demo_dir, id, init_tracing};

use std::error::Error;
use std::path::Path;

use task_core::config::{load_context, parse_service};
use task_core::dag::{Action, GraphBuilder};
use task_core::errors::TaskCoreError;
use task_core::fs::{MockFileSystem, RealFileSystem};
use task_core::inventory::DependencyRef;
use task_core_test_utils::{InventoryBuilder, ServiceBuilder, TemplateBuilder};

type TestResult = Result<(), Box<dyn Error>>;

const INVENTORY: &str = r#"
[hosts.web-1]
roles = ["web"]
"#;

const ROLES: &str = r#"
[web]
services = ["nginx"]
"#;

const NGINX: &str = r#"
id = "nginx"
version = "1.24.0"

[[tasks]]
id = "install"
action = "command"
cmd = "echo install"

[[tasks]]
id = "start"
action = "print"
message = "starting on {host}"
requires = ["install"]
"#;

fn mock_tree() -> MockFileSystem {
    MockFileSystem::new()
        .with_file("deploy/inventory.toml", INVENTORY)
        .with_file("deploy/roles.toml", ROLES)
        .with_file("deploy/services/nginx.toml", NGINX)
        .with_file("deploy/services/README.md", "not a service")
}

fn load(fs: &MockFileSystem) -> task_core::errors::Result<task_core::inventory::InventoryContext> {
    load_context(
        fs,
        Path::new("deploy/services"),
        Path::new("deploy/inventory.toml"),
        Path::new("deploy/roles.toml"),
    )
}

#[test]
fn parses_service_with_tagged_actions() -> TestResult {
    let service = parse_service(NGINX)?;

    assert_eq!(service.id, "nginx");
    assert_eq!(service.version.as_deref(), Some("1.24.0"));
    assert!(matches!(service.tasks[0].action, Action::Command(ref c) if c.cmd == "echo install"));
    assert_eq!(
        service.tasks[1].requires,
        vec![DependencyRef::Local {
            action: "install".into()
        }]
    );
    Ok(())
}

#[test]
fn dependency_reference_forms_parse_by_segment_count() {
    let parse = |s: &str| DependencyRef::try_from(s.to_string());

    assert!(matches!(parse("start"), Ok(DependencyRef::Local { .. })));
    assert!(matches!(parse("db/start"), Ok(DependencyRef::SameHost { .. })));
    assert!(matches!(parse("db-1/db/start"), Ok(DependencyRef::Host { .. })));
    assert!(matches!(parse("*/db/start"), Ok(DependencyRef::AnyHost { .. })));
    assert!(parse("a/b/c/d").is_err());
    assert!(parse("a//c").is_err());
    assert_eq!(parse("*/db/start").unwrap().to_string(), "*/db/start");
}

#[test]
fn unknown_action_kind_is_rejected() {
    let bad = r#"
id = "x"
[[tasks]]
id = "t"
action = "reboot"
"#;
    assert!(matches!(parse_service(bad), Err(TaskCoreError::TomlError(_))));
}

#[test]
fn loads_context_from_mock_fs_and_matches_programmatic_context() -> TestResult {
    init_tracing();

    let loaded = load(&mock_tree())?;

    let expected = InventoryBuilder::new()
        .host("web-1", &["web"])
        .role("web", &["nginx"])
        .service(
            ServiceBuilder::new("nginx")
                .version("1.24.0")
                .task(TemplateBuilder::command("install", "echo install"))
                .task(TemplateBuilder::print("start", "starting on {host}").requires("install")),
        )
        .build();

    assert_eq!(loaded, expected);

    let from_files = GraphBuilder::build(&loaded)?;
    let from_code = GraphBuilder::build(&expected)?;
    assert_eq!(from_files.topological_order(), from_code.topological_order());
    Ok(())
}

#[test]
fn duplicate_service_ids_are_a_config_error() {
    let fs = mock_tree().with_file("deploy/services/nginx-copy.toml", NGINX);

    let err = load(&fs).unwrap_err();
    assert!(matches!(err, TaskCoreError::ConfigError(ref m) if m.contains("duplicate")), "{err}");
}

#[test]
fn services_path_must_be_a_directory() {
    let fs = MockFileSystem::new()
        .with_file("deploy/inventory.toml", INVENTORY)
        .with_file("deploy/roles.toml", ROLES)
        .with_file("deploy/services", "oops");

    assert!(matches!(load(&fs), Err(TaskCoreError::ConfigError(_))));
}

#[test]
fn missing_or_malformed_files_are_config_errors() {
    let missing = MockFileSystem::new().with_file("deploy/roles.toml", ROLES);
    missing.add_dir("deploy/services");
    assert!(matches!(load(&missing), Err(TaskCoreError::ConfigError(_))));

    let malformed = mock_tree().with_file("deploy/roles.toml", "[web\nservices = 3");
    assert!(matches!(load(&malformed), Err(TaskCoreError::ConfigError(_))));
}

#[test]
fn loads_from_real_directory() -> TestResult {
    let dir = tempfile::tempdir()?;
    let services = dir.path().join("services");
    std::fs::create_dir(&services)?;
    std::fs::write(dir.path().join("inventory.toml"), INVENTORY)?;
    std::fs::write(dir.path().join("roles.toml"), ROLES)?;
    std::fs::write(services.join("nginx.toml"), NGINX)?;

    let ctx = load_context(
        &RealFileSystem,
        &services,
        &dir.path().join("inventory.toml"),
        &dir.path().join("roles.toml"),
    )?;

    assert_eq!(ctx.services.len(), 1);
    assert_eq!(GraphBuilder::build(&ctx)?.len(), 2);
    Ok(())
}

#[test]
fn demo_deployment_builds() -> TestResult {
    let root = demo_dir();
    let ctx = load_context(
        &RealFileSystem,
        &root.join("services"),
        &root.join("inventory.toml"),
        &root.join("roles.toml"),
    )?;

    let graph = GraphBuilder::build(&ctx)?;
    assert_eq!(graph.len(), 18);

    let deploy = graph.dependencies_of(&id("web-2/app/deploy")).unwrap();
    assert!(deploy.contains(&id("db-1/mariadb/start")));
    assert!(deploy.contains(&id("web-2/nginx/start")));

    match &graph.get(&id("web-1/nginx/configure")).unwrap().params {
        Action::Command(c) => {
            assert_eq!(c.env.get("NGINX_ROOT").map(String::as_str), Some("/srv/web-1"))
        }
        other => panic!("unexpected action {other:?}"),
    }
    Ok(())
}
