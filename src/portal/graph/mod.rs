// SPDX-License-Identifier: MIT

//! Workflow graph editing
//!
//! This module holds the node/edge graph produced by the visual editor,
//! the step placeholder syntax used inside node inputs, and graph
//! import/export.

pub mod editor;
pub mod loader;
pub mod template;
pub mod types;

pub use editor::{GraphEditor, NodePatch};
pub use loader::GraphLoader;
pub use template::{FieldPath, PathSegment, StepRef};
pub use types::{Edge, Graph, Node, NodeData, NodeKind, Position};
