// SPDX-License-Identifier: MIT

//! The remote executor seam
//!
//! [`RunExecutor`] is everything the client needs from the service that
//! actually runs graphs and agents. [`PortalClient`] implements it over
//! HTTP; tests substitute in-memory executors.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use super::types::{Run, RunAccepted, RunBody, RunList, RunReceipt, RunRequest};
use crate::portal::api::client::plan_gate;
use crate::portal::api::types::Envelope;
use crate::portal::api::PortalClient;
use crate::portal::error::{PortalError, Result};

/// Remote execution service
#[async_trait]
pub trait RunExecutor: Send + Sync {
    /// Execute a graph against a goal and wait for its receipt
    async fn submit_graph(&self, request: &RunRequest) -> Result<RunReceipt>;

    /// Start a stored agent on a goal, returning the new run id
    async fn start_agent_run(&self, agent_id: &str, goal: &str) -> Result<String>;

    /// Current state of a run; `None` when the backend has nothing to report
    async fn fetch_run(&self, run_id: &str) -> Result<Option<Run>>;
}

#[async_trait]
impl RunExecutor for PortalClient {
    async fn submit_graph(&self, request: &RunRequest) -> Result<RunReceipt> {
        let path = "/api/agent/run";
        log::info!(
            "Submitting graph run ({} nodes, {} edges)",
            request.graph.nodes.len(),
            request.graph.edges.len()
        );

        let builder = self.request(Method::POST, path)?.json(request);
        let receipt: RunReceipt = self.send_json(path, builder).await.map_err(|e| {
            log::error!("Run failed: {}", e);
            e
        })?;

        log::info!("Graph run finished: {:?}", receipt.run_id);
        Ok(receipt)
    }

    async fn start_agent_run(&self, agent_id: &str, goal: &str) -> Result<String> {
        if goal.trim().is_empty() {
            return Err(PortalError::invalid_input("goal must not be empty"));
        }

        let (path, builder) = self.call(Method::POST, &["api", "agents", agent_id, "run"])?;
        let builder = builder.json(&json!({ "goal": goal }));
        let envelope: Envelope = self.send_json(&path, builder).await.map_err(plan_gate)?;
        let accepted: RunAccepted = envelope.into_result(&path)?;

        log::info!("Agent {} started run {}", agent_id, accepted.run_id);
        Ok(accepted.run_id)
    }

    async fn fetch_run(&self, run_id: &str) -> Result<Option<Run>> {
        let (path, builder) = self.call(Method::GET, &["api", "agent-runs", run_id])?;
        let envelope: Envelope = self.send_json(&path, builder).await?;

        if !envelope.ok {
            log::debug!("Run {} not reported: {:?}", run_id, envelope.error);
            return Ok(None);
        }
        let body: RunBody = envelope.into_result(&path)?;
        Ok(body.run)
    }
}

impl PortalClient {
    /// All runs visible to the current user
    pub async fn list_runs(&self) -> Result<Vec<Run>> {
        let (path, builder) = self.call(Method::GET, &["api", "agent-runs"])?;
        let envelope: Envelope = self.send_json(&path, builder).await?;
        let list: RunList = envelope.into_result(&path)?;
        Ok(list.runs)
    }
}
