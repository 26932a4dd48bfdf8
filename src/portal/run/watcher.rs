// SPDX-License-Identifier: MIT

//! Run status polling

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::executor::RunExecutor;
use super::types::Run;
use crate::portal::error::Result;

/// Polls a run at a fixed interval until it reaches a terminal status
pub struct RunWatcher {
    executor: Arc<dyn RunExecutor>,
    interval: Duration,
}

impl RunWatcher {
    pub fn new(executor: Arc<dyn RunExecutor>, interval: Duration) -> Self {
        Self { executor, interval }
    }

    /// Start an agent run and watch it to completion
    pub async fn start(
        &self,
        agent_id: &str,
        goal: &str,
        tx: Option<mpsc::Sender<Run>>,
    ) -> Result<Run> {
        let run_id = self.executor.start_agent_run(agent_id, goal).await?;
        self.watch(&run_id, tx).await
    }

    /// Poll `run_id` until it is `succeeded`, `failed` or `cancelled`.
    ///
    /// Every snapshot is forwarded to `tx`. Empty reports keep polling; a
    /// failed poll ends the watch with that error.
    pub async fn watch(&self, run_id: &str, tx: Option<mpsc::Sender<Run>>) -> Result<Run> {
        loop {
            tokio::time::sleep(self.interval).await;

            let run = match self.executor.fetch_run(run_id).await {
                Ok(Some(run)) => run,
                Ok(None) => continue,
                Err(e) => {
                    log::error!("Failed to poll run status for {}: {}", run_id, e);
                    return Err(e);
                }
            };

            log::debug!("Run {} is {}", run_id, run.status);
            if let Some(tx) = &tx {
                let _ = tx.send(run.clone()).await;
            }

            if run.status.is_terminal() {
                log::info!("Run {} finished as {}", run_id, run.status);
                return Ok(run);
            }
        }
    }
}
