// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod inventory;
pub mod logging;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::load_context;
use crate::dag::FileGraphRenderer;
use crate::engine::{ExecutionConfig, RunCoordinator, RunResult};
use crate::errors::TaskCoreError;
use crate::exec::ProcessRunner;
use crate::fs::{FileSystem, RealFileSystem};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - loading the inventory, roles and service files
/// - the run coordinator with the process runner
/// - graph rendering for `--noop`
/// - Ctrl-C handling
///
/// Returns `Ok(true)` when every task succeeded (or nothing ran because of
/// `--noop`), `Ok(false)` when some task failed or was skipped.
pub async fn run(args: CliArgs) -> Result<bool> {
    let started = Instant::now();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let ctx = load_context(fs.as_ref(), &args.services_dir, &args.inventory, &args.roles)?;

    let coordinator = RunCoordinator::new(
        Arc::new(ProcessRunner::new()),
        Arc::new(FileGraphRenderer::new(Arc::clone(&fs))),
    );

    let settings = ExecutionConfig {
        max_parallelism: args.max_parallelism,
        dry_run: args.noop,
    };

    let success = if settings.dry_run {
        let export = coordinator.dry_run(&ctx)?;
        match coordinator.write_graph(&export, &args.graph_output).await {
            Ok(path) => info!(path = ?path, "task graph written"),
            Err(TaskCoreError::GraphExportUnavailable(reason)) => {
                warn!(%reason, "could not render task graph; continuing")
            }
            Err(e) => return Err(e.into()),
        }
        info!(tasks = export.nodes.len(), "Skipping execution due to --noop");
        true
    } else {
        spawn_ctrl_c_listener(coordinator.cancellation_token());

        let result = coordinator.run(&ctx, settings.max_parallelism).await?;
        info!("Ran {} tasks", result.stats.total);
        info!(
            succeeded = result.stats.succeeded,
            failed = result.stats.failed,
            skipped = result.stats.skipped,
            "run statistics"
        );

        if let Some(path) = &args.report {
            write_report(fs.as_ref(), &result, path)?;
        }

        result.is_success()
    };

    info!(elapsed = ?started.elapsed(), "done");
    Ok(success)
}

/// Ctrl-C → stop dispatching, let in-flight tasks finish.
fn spawn_ctrl_c_listener(token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        warn!("Ctrl+C received; cancelling run");
        token.cancel();
    });
}

/// Run the deployment laid out in `framework_dir` (`services/`,
/// `inventory.toml`, `roles.toml`) and hand back the full result.
pub async fn run_example(framework_dir: &Path, max_parallelism: usize) -> Result<RunResult> {
    let started = Instant::now();
    let fs = RealFileSystem;

    let ctx = load_context(
        &fs,
        &framework_dir.join("services"),
        &framework_dir.join("inventory.toml"),
        &framework_dir.join("roles.toml"),
    )
    .with_context(|| format!("loading example deployment from {framework_dir:?}"))?;

    let coordinator = RunCoordinator::new(
        Arc::new(ProcessRunner::new()),
        Arc::new(FileGraphRenderer::new(Arc::new(fs))),
    );
    spawn_ctrl_c_listener(coordinator.cancellation_token());

    info!("Running...");
    let result = coordinator.run(&ctx, max_parallelism).await?;
    info!("Ran {} tasks", result.stats.total);
    info!(elapsed = ?started.elapsed(), "done");
    Ok(result)
}

fn write_report(fs: &dyn FileSystem, result: &RunResult, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(result).context("serialising run report")?;
    fs.write(path, &json)?;
    info!(path = ?path, "run report written");
    Ok(())
}
