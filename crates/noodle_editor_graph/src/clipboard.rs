// SPDX-License-Identifier: MIT OR Apache-2.0
//! Process-local copy/paste of node selections.

use crate::document::{instantiate, EdgeRecord, NodeRecord};
use crate::graph::Graph;
use crate::node::{NodeId, DEFAULT_NODE_WIDTH};
use egui::{Pos2, Rect};
use indexmap::IndexSet;

/// Snapshot of copied nodes and the edges running between them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clipboard {
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
}

impl Clipboard {
    /// Snapshot the selected nodes.
    ///
    /// Only edges with both ends inside the selection are kept.
    pub fn copy(graph: &Graph, selection: &IndexSet<NodeId>) -> Self {
        let nodes: Vec<NodeRecord> = graph
            .nodes()
            .filter(|n| selection.contains(&n.id))
            .map(NodeRecord::from_node)
            .collect();
        let edges = graph
            .serialize()
            .edges
            .into_iter()
            .filter(|e| selection.contains(&e.from_node) && selection.contains(&e.to_node))
            .collect();
        tracing::debug!("Copied {} nodes", nodes.len());
        Self { nodes, edges }
    }

    /// Whether nothing has been copied
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Copied node records
    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    /// Copied edge records
    pub fn edges(&self) -> &[EdgeRecord] {
        &self.edges
    }

    /// Bounding box of the copied nodes in their original positions
    pub fn bounds(&self) -> Option<Rect> {
        self.nodes
            .iter()
            .map(|n| {
                let width = if n.width > 0.0 { n.width } else { DEFAULT_NODE_WIDTH };
                Rect::from_min_size(n.position(), egui::vec2(width, n.height.max(0.0)))
            })
            .reduce(|acc, r| acc.union(r))
    }

    /// Paste with fresh IDs so the bounding-box centre lands on `at`.
    ///
    /// Returns the new node IDs in clipboard order.
    pub fn paste(&self, graph: &mut Graph, at: Pos2) -> Vec<NodeId> {
        let Some(bounds) = self.bounds() else {
            return Vec::new();
        };
        let offset = at - bounds.center();
        let pasted = instantiate(graph, &self.nodes, &self.edges, offset, true);
        tracing::info!("Pasted {} nodes and {} edges", pasted.nodes.len(), pasted.edges.len());
        pasted.nodes
    }
}
