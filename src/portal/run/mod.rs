// SPDX-License-Identifier: MIT

//! Run submission and observation
//!
//! Graph runs are submitted once and answered with a summary; agent runs
//! are started and then polled until they reach a terminal status.

pub mod executor;
pub mod summary;
pub mod types;
pub mod watcher;

pub use executor::RunExecutor;
pub use summary::SummaryArtifact;
pub use types::{Run, RunReceipt, RunRequest, RunStatus, Step, StepStatus, DEFAULT_GRAPH_GOAL};
pub use watcher::RunWatcher;
