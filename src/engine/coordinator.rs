// src/engine/coordinator.rs

//! One end-to-end invocation: build the graph, then either execute it or
//! export its structure.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dag::{GraphBuilder, GraphExport, GraphRenderer, TaskGraph};
use crate::engine::observer::{RunObserver, TracingObserver};
use crate::engine::result::RunResult;
use crate::engine::runtime::Executor;
use crate::errors::Result;
use crate::exec::ActionRunner;
use crate::inventory::InventoryContext;

pub struct RunCoordinator<R: ActionRunner> {
    runner: Arc<R>,
    renderer: Arc<dyn GraphRenderer>,
    observer: Arc<dyn RunObserver>,
    cancel: CancellationToken,
}

impl<R: ActionRunner> fmt::Debug for RunCoordinator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunCoordinator")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<R: ActionRunner> RunCoordinator<R> {
    pub fn new(runner: Arc<R>, renderer: Arc<dyn GraphRenderer>) -> Self {
        Self {
            runner,
            renderer,
            observer: Arc::new(TracingObserver),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Build and validate the task graph for `ctx`.
    pub fn build(&self, ctx: &InventoryContext) -> Result<TaskGraph> {
        let graph = GraphBuilder::build(ctx)?;
        self.observer.graph_built(&graph);
        Ok(graph)
    }

    /// Build, then execute. Nothing runs if the build fails.
    pub async fn run(&self, ctx: &InventoryContext, max_parallelism: usize) -> Result<RunResult> {
        let graph = self.build(ctx)?;

        let executor = Executor::new(Arc::clone(&self.runner))
            .with_observer(Arc::clone(&self.observer))
            .with_cancellation(self.cancel.clone());

        Ok(executor.execute(&graph, max_parallelism).await)
    }

    /// Build only and describe the graph. Nothing executes.
    pub fn dry_run(&self, ctx: &InventoryContext) -> Result<GraphExport> {
        let graph = self.build(ctx)?;
        let export = GraphExport::from_graph(&graph);
        debug!(
            nodes = export.nodes.len(),
            edges = export.edges.len(),
            "dry run: graph exported"
        );
        Ok(export)
    }

    /// Render an export to `path`.
    ///
    /// Fails with `GraphExportUnavailable` when no backend can produce the
    /// requested format; callers treat that as a warning.
    pub async fn write_graph(&self, export: &GraphExport, path: &Path) -> Result<PathBuf> {
        self.renderer.render(export, path).await
    }
}
