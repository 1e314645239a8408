// src/dag/export.rs

//! Structural export of a task graph, plus rendering to files.
//!
//! The export itself is plain data (nodes + edges). Rendering picks a format
//! from the output path's extension:
//! - `.json`: the export serialized as JSON
//! - `.dot` / `.gv`: Graphviz source
//! - anything else (`.svg`, `.png`, ...): Graphviz source piped through the
//!   `dot` binary. A missing or failing binary is reported as
//!   [`TaskCoreError::GraphExportUnavailable`].

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::dag::graph::TaskGraph;
use crate::dag::task::TaskId;
use crate::errors::{Result, TaskCoreError};
use crate::fs::FileSystem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: TaskId,
    pub host: String,
    pub service: String,
    pub action: String,
    /// Action kind (`noop`, `print`, `command`).
    pub kind: String,
}

/// `from` must complete before `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEdge {
    pub from: TaskId,
    pub to: TaskId,
}

/// Node and edge lists of a task graph, both sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

impl GraphExport {
    pub fn from_graph(graph: &TaskGraph) -> Self {
        let nodes = graph
            .tasks()
            .map(|t| ExportNode {
                id: t.id.clone(),
                host: t.host.clone(),
                service: t.service.clone(),
                action: t.action.clone(),
                kind: t.params.kind().to_string(),
            })
            .collect();

        let mut edges: Vec<ExportEdge> = graph
            .edges()
            .map(|(from, to)| ExportEdge {
                from: from.clone(),
                to: to.clone(),
            })
            .collect();
        edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

        Self { nodes, edges }
    }

    /// Graphviz source for this export.
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraph<&str, &str> = DiGraph::new();
        let indices: std::collections::BTreeMap<&TaskId, _> = self
            .nodes
            .iter()
            .map(|n| (&n.id, graph.add_node(n.id.as_str())))
            .collect();

        for edge in &self.edges {
            if let (Some(&from), Some(&to)) = (indices.get(&edge.from), indices.get(&edge.to)) {
                graph.add_edge(from, to, "");
            }
        }

        format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}

/// Future returned by [`GraphRenderer::render`].
pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>>;

/// Something that can turn a [`GraphExport`] into an artifact at a path.
pub trait GraphRenderer: Send + Sync {
    fn render<'a>(&'a self, export: &'a GraphExport, path: &'a Path) -> RenderFuture<'a>;
}

/// Production renderer: JSON and DOT are written through the [`FileSystem`],
/// images are produced by the Graphviz `dot` binary.
#[derive(Debug, Clone)]
pub struct FileGraphRenderer {
    fs: Arc<dyn FileSystem>,
    dot_binary: PathBuf,
}

impl FileGraphRenderer {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            dot_binary: PathBuf::from("dot"),
        }
    }

    /// Use a specific Graphviz executable instead of `dot` from `PATH`.
    pub fn with_dot_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.dot_binary = path.into();
        self
    }

    fn unavailable(&self, doing: &str, err: std::io::Error) -> TaskCoreError {
        TaskCoreError::GraphExportUnavailable(format!(
            "{doing} graphviz binary {:?}: {err}",
            self.dot_binary
        ))
    }

    /// Every failure here maps to `GraphExportUnavailable`.
    async fn render_image(&self, dot_source: String, format: &str, path: &Path) -> Result<()> {
        debug!(binary = ?self.dot_binary, format, ?path, "invoking graphviz");

        let mut child = Command::new(&self.dot_binary)
            .arg(format!("-T{format}"))
            .arg("-o")
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.unavailable("starting", e))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(dot_source.as_bytes()).await {
                Ok(()) => {}
                // Graphviz quit before reading everything; its exit status says why.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!("graphviz closed its input early");
                }
                Err(e) => return Err(self.unavailable("writing to", e)),
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.unavailable("waiting for", e))?;
        if !output.status.success() {
            return Err(TaskCoreError::GraphExportUnavailable(format!(
                "graphviz exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl GraphRenderer for FileGraphRenderer {
    fn render<'a>(&'a self, export: &'a GraphExport, path: &'a Path) -> RenderFuture<'a> {
        Box::pin(async move {
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();

            match extension.as_str() {
                "json" => {
                    let json = serde_json::to_vec_pretty(export)?;
                    self.fs.write(path, &json)?;
                }
                "dot" | "gv" => {
                    self.fs.write(path, export.to_dot().as_bytes())?;
                }
                "" => {
                    return Err(TaskCoreError::GraphExportUnavailable(format!(
                        "cannot infer output format from {path:?}"
                    )));
                }
                format => self.render_image(export.to_dot(), format, path).await?,
            }

            info!(
                path = ?path,
                nodes = export.nodes.len(),
                edges = export.edges.len(),
                "task graph rendered"
            );
            Ok(path.to_path_buf())
        })
    }
}
