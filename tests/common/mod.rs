#![allow(dead_code)]

use std::path::PathBuf;

use task_core::dag::TaskId;
use task_core::inventory::InventoryContext;
pub use task_core_test_utils::builders;
pub use task_core_test_utils::{init_tracing, with_timeout};

use task_core_test_utils::{InventoryBuilder, ServiceBuilder, TemplateBuilder};

pub fn id(s: &str) -> TaskId {
    TaskId::from(s)
}

/// Directory of the bundled demo deployment.
pub fn demo_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/framework")
}

/// One host running a linear chain: install -> configure -> start.
pub fn web_chain_context() -> InventoryContext {
    InventoryBuilder::new()
        .host("web-1", &["web"])
        .role("web", &["nginx"])
        .service(
            ServiceBuilder::new("nginx")
                .noop("install", &[])
                .noop("configure", &["install"])
                .noop("start", &["configure"]),
        )
        .build()
}

/// Two web hosts and one db host; `app/deploy` on each web host waits for
/// `mariadb/start` wherever it is deployed.
pub fn two_tier_context() -> InventoryContext {
    InventoryBuilder::new()
        .host("web-1", &["base", "web"])
        .host("web-2", &["base", "web"])
        .host("db-1", &["base", "db"])
        .role("base", &["packages"])
        .role("web", &["app"])
        .role("db", &["mariadb"])
        .service(ServiceBuilder::new("packages").noop("install", &[]))
        .service(
            ServiceBuilder::new("mariadb")
                .after("packages")
                .noop("install", &[])
                .noop("start", &["install"]),
        )
        .service(
            ServiceBuilder::new("app")
                .after("packages")
                .task(TemplateBuilder::noop("deploy").requires("*/mariadb/start"))
                .task(TemplateBuilder::print("verify", "{host} ok").requires("deploy")),
        )
        .build()
}
