// SPDX-License-Identifier: MIT

//! Typed error handling for the portal client
//!
//! Every failure is scoped to a single request or editor action; nothing
//! here is fatal to the process and nothing is retried.

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T, E = PortalError> = std::result::Result<T, E>;

/// Top-level error type for the portal client
#[derive(Debug, Error)]
pub enum PortalError {
    /// Transport failures (connect, TLS, body read)
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the backend
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The backend refused a plan-gated feature (HTTP 403)
    #[error("{0}")]
    PlanRequired(String),

    /// The backend answered with `ok: false`
    #[error("{endpoint} rejected the request: {message}")]
    Rejected { endpoint: String, message: String },

    /// Caller-side validation failed before any request was sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors (bad env vars, unparsable base URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Graph editing errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Graph editor errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// Text typed into a node's input editor was not valid JSON
    #[error("Invalid JSON for node '{node_id}': {source}")]
    InvalidInput {
        node_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Referenced node does not exist
    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    /// Malformed `{{step:...}}` placeholder
    #[error("Malformed placeholder '{0}'")]
    MalformedPlaceholder(String),
}

/// Failure to turn one `data:` line of a chat stream into a chunk
#[derive(Debug, Error)]
pub enum StreamError {
    /// Payload is not JSON (often a fragment split across reads)
    #[error("Malformed stream payload '{payload}': {source}")]
    Malformed {
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    /// Payload is JSON but carries no usable `content`
    #[error("Stream payload has no content: {0}")]
    MissingContent(String),
}

impl PortalError {
    /// Create a status error
    pub fn status(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a rejection error
    pub fn rejected(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
