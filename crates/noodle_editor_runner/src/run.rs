// SPDX-License-Identifier: MIT OR Apache-2.0
//! Load a project, execute it once and collect what it produced.

use noodle_editor_graph::nodes::create_builtin_registry;
use noodle_editor_graph::{
    Direction, Graph, GraphError, GraphStore, JsonFileStore, NodeId, StoreError, Value,
};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors that stop a run
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Command line could not be understood
    #[error("usage: noodle-run <project.json> [--log]")]
    Usage,

    /// The project file does not exist
    #[error("project not found: {0}")]
    NotFound(String),

    /// The project could not be read
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The graph could not be executed
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Project document
    pub project: String,
    /// Print captured log events after the report
    pub show_log: bool,
}

impl RunArgs {
    /// Parse arguments, excluding the program name
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, RunnerError> {
        let mut project = None;
        let mut show_log = false;
        for arg in args {
            match arg.as_str() {
                "--log" => show_log = true,
                flag if flag.starts_with("--") => return Err(RunnerError::Usage),
                _ if project.is_some() => return Err(RunnerError::Usage),
                _ => project = Some(arg),
            }
        }
        Ok(Self {
            project: project.ok_or(RunnerError::Usage)?,
            show_log,
        })
    }
}

/// Values and displays of one node after a run
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    /// Node ID
    pub id: NodeId,
    /// Node title
    pub title: String,
    /// Output values, in socket order
    pub outputs: Vec<(String, Value)>,
    /// After-execute display text
    pub display: Option<String>,
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Nodes in evaluation order
    pub nodes: Vec<NodeReport>,
    /// Load problems that were skipped
    pub skipped: Vec<String>,
    /// Hooks that failed
    pub hook_failures: Vec<String>,
}

impl RunSummary {
    /// Human-readable report
    pub fn render(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            let _ = writeln!(out, "{} ({})", node.title, node.id);
            for (socket, value) in &node.outputs {
                let _ = writeln!(out, "  {socket} = {value}");
            }
            if let Some(display) = &node.display {
                for line in display.lines() {
                    let _ = writeln!(out, "  | {line}");
                }
            }
        }
        for skipped in &self.skipped {
            let _ = writeln!(out, "skipped: {skipped}");
        }
        for failure in &self.hook_failures {
            let _ = writeln!(out, "hook failed: {failure}");
        }
        out
    }
}

/// Load `path` with the built-in node types and execute it once
pub async fn run_project(path: &Path) -> Result<RunSummary, RunnerError> {
    let store = JsonFileStore::new(path);
    let document = store
        .load()?
        .ok_or_else(|| RunnerError::NotFound(path.display().to_string()))?;

    let mut graph = Graph::new(Arc::new(create_builtin_registry()));
    let load = graph.deserialize(&document);
    tracing::info!(
        "Loaded {} nodes and {} edges from {}",
        load.nodes,
        load.edges,
        path.display()
    );

    let report = graph.execute().await?;

    let nodes = report
        .order
        .iter()
        .filter_map(|id| graph.node(id))
        .map(|node| NodeReport {
            id: node.id.clone(),
            title: node.title.clone(),
            outputs: node
                .sockets(Direction::Output)
                .iter()
                .filter_map(|s| s.value().map(|v| (s.id.to_string(), v.clone())))
                .collect(),
            display: node.display().map(str::to_string),
        })
        .collect();

    Ok(RunSummary {
        nodes,
        skipped: load.skipped.iter().map(ToString::to_string).collect(),
        hook_failures: report
            .hook_failures
            .iter()
            .map(|(id, err)| format!("{id}: {err}"))
            .collect(),
    })
}
