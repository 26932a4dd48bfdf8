//! Workflow graph type definitions
//!
//! The wire shape matches the editor's node shape: the presentational
//! kind serializes as `type` and the step payload lives under `data`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::template::{self, StepRef};

/// A workflow graph as edited and transmitted
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct Graph {
    /// Steps, in insertion order (not a topological order)
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Directed dependency links
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// A step in the workflow
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Node {
    /// Unique identifier, also the key for edges and placeholders
    pub id: String,
    /// Visual shape only
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    /// Layout only
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
}

/// Executor-facing payload of a node
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NodeData {
    /// Display name, independent of the id
    pub label: String,
    /// Executor capability, e.g. `plan`, `web_search`, `llm`
    pub tool: String,
    /// Tool parameters; strings may hold `{{step:...}}` placeholders
    #[serde(default = "empty_input")]
    pub input: Value,
}

/// Presentational node kind
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Input,
    #[default]
    Default,
    Output,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A directed link between two nodes
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub animated: bool,
}

/// A placeholder found in a node input, with its owner
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReference {
    /// Node whose input contains the placeholder
    pub node_id: String,
    pub reference: StepRef,
    /// Whether the referenced node currently exists
    pub target_present: bool,
}

pub(crate) fn empty_input() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Node {
    pub fn new(id: impl Into<String>, tool: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Default,
            position: Position::default(),
            data: NodeData {
                label: label.into(),
                tool: tool.into(),
                input: empty_input(),
            },
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.data.input = input;
        self
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Every well-formed placeholder in every node input
    pub fn references(&self) -> Vec<NodeReference> {
        self.nodes
            .iter()
            .flat_map(|node| {
                template::find_references(&node.data.input)
                    .into_iter()
                    .map(move |reference| (node, reference))
            })
            .map(|(node, reference)| NodeReference {
                node_id: node.id.clone(),
                target_present: self.contains_node(&reference.node_id),
                reference,
            })
            .collect()
    }

    /// Pretty-printed JSON, as written to `workflow-graph.json`
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
