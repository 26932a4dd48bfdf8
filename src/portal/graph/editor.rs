// SPDX-License-Identifier: MIT

//! Editor state for a workflow graph
//!
//! `GraphEditor` owns the live graph and exposes the mutations the visual
//! editor needs. Mutations take `&mut self`, so a caller can never observe
//! a half-applied edit; in particular a deleted node never leaves edges
//! behind.

use rand::Rng;
use serde_json::{json, Value};
use uuid::Uuid;

use super::types::{Edge, Graph, Node, NodeKind, Position};
use crate::portal::error::GraphError;

/// Region new nodes are scattered into
const SPAWN_X: std::ops::Range<f64> = 100.0..500.0;
const SPAWN_Y: std::ops::Range<f64> = 100.0..400.0;

/// Fields of a node that may be edited in place. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    pub label: Option<String>,
    pub tool: Option<String>,
    pub input: Option<Value>,
}

/// Mutable editor state
#[derive(Debug, Clone, Default)]
pub struct GraphEditor {
    graph: Graph,
    selected: Option<String>,
}

impl NodePatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn tool(tool: impl Into<String>) -> Self {
        Self {
            tool: Some(tool.into()),
            ..Self::default()
        }
    }

    pub fn input(input: Value) -> Self {
        Self {
            input: Some(input),
            ..Self::default()
        }
    }
}

impl GraphEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Edit an existing graph (e.g. one loaded from disk)
    pub fn from_graph(graph: Graph) -> Self {
        Self {
            graph,
            selected: None,
        }
    }

    /// The plan -> search -> analyze workflow new editors open with
    pub fn starter() -> Self {
        let nodes = vec![
            Node::new("plan", "plan", "Plan")
                .with_kind(NodeKind::Input)
                .with_position(100.0, 100.0),
            Node::new("search", "web_search", "Web Search")
                .with_position(300.0, 100.0)
                .with_input(json!({ "query": "{{step:plan.response.query}}" })),
            Node::new("analyze", "llm", "Analyze")
                .with_position(500.0, 100.0)
                .with_input(json!({
                    "prompt": "Analyze findings: {{step:search.response.results[0].snippet}}"
                })),
        ];
        let edges = vec![
            Edge {
                id: "e1".to_string(),
                source: "plan".to_string(),
                target: "search".to_string(),
                animated: true,
            },
            Edge {
                id: "e2".to_string(),
                source: "search".to_string(),
                target: "analyze".to_string(),
                animated: true,
            },
        ];

        Self::from_graph(Graph { nodes, edges })
    }

    /// Read access to the live graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Add a node for `tool` at a random spot on the canvas
    pub fn add_node(&mut self, tool: &str) -> &Node {
        let mut rng = rand::thread_rng();
        let position = Position::new(rng.gen_range(SPAWN_X), rng.gen_range(SPAWN_Y));
        self.add_node_at(tool, position)
    }

    /// Add a node for `tool` at a fixed position
    pub fn add_node_at(&mut self, tool: &str, position: Position) -> &Node {
        let id = self.next_node_id();
        let mut node = Node::new(id, tool, capitalize(tool));
        node.position = position;

        log::debug!("Adding node {} ({})", node.id, tool);
        self.graph.nodes.push(node);
        &self.graph.nodes[self.graph.nodes.len() - 1]
    }

    /// Link `source` to `target`. Cycles, self-loops, duplicates and
    /// unknown ids are all accepted.
    pub fn connect(&mut self, source: &str, target: &str) -> &Edge {
        let edge = Edge {
            id: format!("edge-{}", Uuid::new_v4()),
            source: source.to_string(),
            target: target.to_string(),
            animated: true,
        };

        log::debug!("Connecting {} -> {}", source, target);
        self.graph.edges.push(edge);
        &self.graph.edges[self.graph.edges.len() - 1]
    }

    /// Shallow-merge `patch` into a node. Returns `false` if the node is unknown.
    pub fn update_node(&mut self, node_id: &str, patch: NodePatch) -> bool {
        let Some(node) = self.node_mut(node_id) else {
            return false;
        };

        if let Some(label) = patch.label {
            node.data.label = label;
        }
        if let Some(tool) = patch.tool {
            node.data.tool = tool;
        }
        if let Some(input) = patch.input {
            node.data.input = input;
        }
        true
    }

    /// Replace a node's input with JSON typed by the user. Invalid JSON is
    /// rejected and the previous input is kept.
    pub fn update_node_input_json(&mut self, node_id: &str, text: &str) -> Result<(), GraphError> {
        let input: Value = serde_json::from_str(text).map_err(|source| {
            log::warn!("Rejected input edit for node {}: {}", node_id, source);
            GraphError::InvalidInput {
                node_id: node_id.to_string(),
                source,
            }
        })?;
        if self.update_node(node_id, NodePatch::input(input)) {
            Ok(())
        } else {
            Err(GraphError::NodeNotFound(node_id.to_string()))
        }
    }

    /// Move a node. Layout only.
    pub fn move_node(&mut self, node_id: &str, position: Position) -> bool {
        match self.node_mut(node_id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Remove a node together with every edge that touches it, clearing the
    /// selection if it pointed at the node.
    pub fn delete_node(&mut self, node_id: &str) -> Option<Node> {
        let index = self.graph.nodes.iter().position(|n| n.id == node_id);
        let removed = index.map(|i| self.graph.nodes.remove(i));

        self.graph
            .edges
            .retain(|e| e.source != node_id && e.target != node_id);
        if self.selected.as_deref() == Some(node_id) {
            self.selected = None;
        }

        if removed.is_some() {
            log::debug!("Deleted node {}", node_id);
        }
        removed
    }

    /// Select a node for editing. Unknown ids clear the selection.
    pub fn select(&mut self, node_id: &str) -> bool {
        if self.graph.contains_node(node_id) {
            self.selected = Some(node_id.to_string());
            true
        } else {
            self.selected = None;
            false
        }
    }

    pub fn selected(&self) -> Option<&Node> {
        self.selected.as_deref().and_then(|id| self.graph.node(id))
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Owned snapshot for transmission or export
    pub fn serialize(&self) -> Graph {
        self.graph.clone()
    }

    fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.graph.nodes.iter_mut().find(|n| n.id == node_id)
    }

    /// `node-<unix millis>`, bumped until it is free in this graph
    fn next_node_id(&self) -> String {
        let mut stamp = chrono::Utc::now().timestamp_millis();
        loop {
            let id = format!("node-{}", stamp);
            if !self.graph.contains_node(&id) {
                return id;
            }
            stamp += 1;
        }
    }
}

fn capitalize(tool: &str) -> String {
    let mut chars = tool.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
