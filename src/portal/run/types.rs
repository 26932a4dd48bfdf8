//! Run request and record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::portal::api::types::id;
use crate::portal::graph::Graph;

/// Goal sent with graphs executed from the editor
pub const DEFAULT_GRAPH_GOAL: &str = "Execute visual DAG workflow";

/// Body of `POST /api/agent/run`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRequest {
    pub goal: String,
    pub graph: Graph,
}

/// Answer to a graph run
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunReceipt {
    /// Markdown report, when the executor produced one
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "id::deserialize_opt")]
    pub run_id: Option<String>,
}

/// Server-side lifecycle of a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// Lifecycle of one step inside a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Queued,
    Running,
    Done,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(deserialize_with = "id::deserialize")]
    pub id: String,
    pub index: u32,
    pub tool: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// A server-tracked execution. The client only observes transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    #[serde(deserialize_with = "id::deserialize")]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "id::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub agent_id: Option<String>,
    pub status: RunStatus,
    #[serde(default)]
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits_used: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// `{ok, runId}` from starting an agent run
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunAccepted {
    #[serde(deserialize_with = "id::deserialize")]
    pub run_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunBody {
    #[serde(default)]
    pub run: Option<Run>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunList {
    #[serde(default)]
    pub runs: Vec<Run>,
}

impl RunRequest {
    pub fn new(goal: impl Into<String>, graph: Graph) -> Self {
        Self {
            goal: goal.into(),
            graph,
        }
    }
}

impl RunStatus {
    /// `succeeded`, `failed` and `cancelled` end polling
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
