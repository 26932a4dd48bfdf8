//! Run summary download

use std::fs;
use std::path::{Path, PathBuf};

use super::types::RunReceipt;
use crate::portal::error::Result;

/// A markdown report ready to be saved
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryArtifact {
    /// `agent-run-<runId>.md`
    pub file_name: String,
    /// The summary text, unchanged
    pub contents: String,
}

impl RunReceipt {
    /// The downloadable report, if the executor returned a summary
    pub fn summary_artifact(&self) -> Option<SummaryArtifact> {
        let summary = self.summary.as_ref()?;
        let file_name = match &self.run_id {
            Some(id) => format!("agent-run-{}.md", id),
            None => "agent-run.md".to_string(),
        };

        Some(SummaryArtifact {
            file_name,
            contents: summary.clone(),
        })
    }
}

impl SummaryArtifact {
    /// Save into `dir`, returning the written path
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        fs::write(&path, &self.contents)?;
        log::info!("Saved run summary to {}", path.display());
        Ok(path)
    }
}
