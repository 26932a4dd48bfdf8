// SPDX-License-Identifier: MIT

//! Portal resource types and the `{ok, ...}` response envelope

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::portal::error::{PortalError, Result};

/// Every portal endpoint wraps its payload as `{ok, error?, <payload>}`.
///
/// The payload stays untyped until `ok` is known, since rejections carry
/// none of the payload's fields.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Envelope {
    /// Decode the payload, turning `ok: false` into [`PortalError::Rejected`]
    pub fn into_result<T: DeserializeOwned>(self, endpoint: &str) -> Result<T> {
        if !self.ok {
            let message = self.error.unwrap_or_else(|| "ok: false".to_string());
            return Err(PortalError::rejected(endpoint, message));
        }
        Ok(serde_json::from_value(Value::Object(self.body))?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    #[serde(deserialize_with = "id::deserialize")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    #[serde(deserialize_with = "id::deserialize")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(
        default,
        deserialize_with = "id::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A DeepAgent definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    #[serde(deserialize_with = "id::deserialize")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Subscription tier of the signed-in user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Enterprise,
}

/// Plans that may start multi-step agent runs
pub const DEEP_AGENT_PLANS: &[Plan] = &[Plan::Pro, Plan::Enterprise];

impl Plan {
    /// Parse a plan name; unknown names fall back to `Free`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "pro" => Plan::Pro,
            "enterprise" => Plan::Enterprise,
            _ => Plan::Free,
        }
    }

    pub fn permits(&self, required: &[Plan]) -> bool {
        required.contains(self)
    }
}

// Payload shapes behind the envelope

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectList {
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectBody {
    pub project: Project,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatList {
    #[serde(default)]
    pub chats: Vec<Chat>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatBody {
    pub chat: Chat,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AgentList {
    #[serde(default)]
    pub agents: Vec<Agent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AgentBody {
    pub agent: Agent,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserBody {
    #[serde(default)]
    pub user: Option<UserInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserInfo {
    #[serde(default)]
    pub plan: Option<String>,
}

/// Backend ids arrive as strings or numbers; both become `String`
pub(crate) mod id {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!(
                "expected string or number id, got {}",
                other
            ))),
        }
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(D::Error::custom(format!(
                "expected string or number id, got {}",
                other
            ))),
        }
    }
}
