// SPDX-License-Identifier: MIT

//! Client configuration
//!
//! Values come from the environment (a `.env` file is loaded by the CLI).
//! Credentials are passed into the request layer explicitly.
//!
//! The base URL is an origin (`scheme://host[:port]`). Endpoint paths are
//! absolute, so a base URL carrying a path is rejected rather than having
//! its path silently replaced.

use std::env;
use std::fmt;
use std::time::Duration;

use url::Url;

use super::error::{PortalError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_MODEL: &str = "openai:gpt-4o";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials attached to every request
#[derive(Clone, Default)]
pub struct Credentials {
    bearer_token: Option<String>,
}

impl Credentials {
    /// No `Authorization` header
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// `Authorization: Bearer <token>`
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
        }
    }

    /// Header value, if any
    pub fn authorization(&self) -> Option<String> {
        self.bearer_token
            .as_ref()
            .map(|token| format!("Bearer {}", token))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = self.bearer_token.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("bearer_token", &token)
            .finish()
    }
}

/// Portal client configuration
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Backend origin; endpoint paths are joined onto it
    pub base_url: Url,
    pub credentials: Credentials,
    /// Delay between run status polls
    pub poll_interval: Duration,
    /// Deadline for short JSON calls. Chat streams and graph runs are only
    /// bounded by `connect_timeout`.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Model id sent with chat turns
    pub default_model: String,
}

impl PortalConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() || base_url.path() != "/" {
            return Err(PortalError::config(format!(
                "base URL must be an origin without a path, got '{}'",
                base_url
            )));
        }

        Ok(Self {
            base_url,
            credentials: Credentials::anonymous(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            default_model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Load configuration from `PORTAL_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("PORTAL_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Some(token) = lookup("PORTAL_API_TOKEN") {
            if !token.trim().is_empty() {
                config.credentials = Credentials::bearer(token.trim());
            }
        }
        if let Some(interval) = parse_secs(&lookup, "PORTAL_POLL_INTERVAL_SECS")? {
            config.poll_interval = interval;
        }
        if let Some(timeout) = parse_secs(&lookup, "PORTAL_TIMEOUT_SECS")? {
            config.request_timeout = timeout;
        }
        if let Some(model) = lookup("PORTAL_MODEL") {
            config.default_model = model;
        }

        Ok(config)
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Resolve a fixed endpoint path against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Build an endpoint from path segments, percent-encoding each one.
    /// Use this whenever a segment carries an id.
    pub fn endpoint_segments(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PortalError::config(format!("'{}' cannot take a path", self.base_url)))?
            .clear()
            .extend(segments);
        Ok(url)
    }
}

/// Whole, non-zero seconds
fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| PortalError::config(format!("{} must be whole seconds: {}", key, e)))?;
    if secs == 0 {
        return Err(PortalError::config(format!("{} must be greater than zero", key)));
    }
    Ok(Some(Duration::from_secs(secs)))
}
