// SPDX-License-Identifier: MIT

//! Portal API access
//!
//! [`PortalClient`] wraps the backend's JSON-over-HTTP endpoints. Run and
//! chat endpoints are added to it by the `run` and `chat` modules.

pub mod client;
pub mod types;

pub use client::{PortalClient, PLAN_REQUIRED_MESSAGE};
pub use types::{Agent, Chat, Plan, Project, DEEP_AGENT_PLANS};
