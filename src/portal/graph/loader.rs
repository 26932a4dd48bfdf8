//! Graph loader - file import and export
//!
//! Graphs are exported as pretty-printed JSON. Import accepts the same JSON
//! or a YAML rendering of it, chosen by file extension.

use super::types::Graph;
use crate::portal::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// File name used when exporting a graph into a directory
pub const EXPORT_FILE_NAME: &str = "workflow-graph.json";

/// Loads and saves workflow graphs
pub struct GraphLoader;

impl GraphLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a graph from a `.json`, `.yaml` or `.yml` file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Graph> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");

        if is_yaml {
            Self::parse_yaml(&content)
        } else {
            Self::parse_json(&content)
        }
    }

    pub fn parse_json(content: &str) -> Result<Graph> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn parse_yaml(content: &str) -> Result<Graph> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Write `graph` as pretty JSON to exactly `path`
    pub fn save<P: AsRef<Path>>(&self, graph: &Graph, path: P) -> Result<()> {
        fs::write(path, graph.to_json_pretty()?)?;
        Ok(())
    }

    /// Write `graph` to `<dir>/workflow-graph.json`
    pub fn export<P: AsRef<Path>>(&self, graph: &Graph, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(EXPORT_FILE_NAME);
        self.save(graph, &path)?;
        log::info!("Exported graph to {}", path.display());
        Ok(path)
    }
}

impl Default for GraphLoader {
    fn default() -> Self {
        Self::new()
    }
}
