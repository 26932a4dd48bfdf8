// SPDX-License-Identifier: MIT

//! HTTP client for the portal backend

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use super::types::{
    Agent, AgentBody, AgentList, Chat, ChatBody, ChatList, Envelope, Plan, Project, ProjectBody,
    ProjectList, UserBody,
};
use crate::portal::chat::Message;
use crate::portal::config::PortalConfig;
use crate::portal::error::{PortalError, Result};

/// Shown when the backend refuses an agent run for the current plan
pub const PLAN_REQUIRED_MESSAGE: &str = "DeepAgent functionality requires Pro or Enterprise plan. Please upgrade to access multi-step agents.";

/// Client for the portal API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: Client,
    config: PortalConfig,
}

impl PortalClient {
    /// Only connecting is bounded client-wide. Short JSON calls add
    /// `request_timeout` per request; streamed replies and graph runs may
    /// take as long as the backend needs.
    pub fn new(config: PortalConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Start an unbounded request to a fixed path, credentials attached
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.config.endpoint(path)?;
        Ok(self.authorized(method, url))
    }

    /// Start a short JSON call to an endpoint built from `segments`.
    /// Returns the encoded path alongside, for logs and errors.
    pub(crate) fn call(&self, method: Method, segments: &[&str]) -> Result<(String, RequestBuilder)> {
        let url = self.config.endpoint_segments(segments)?;
        let path = url.path().to_string();
        let builder = self
            .authorized(method, url)
            .timeout(self.config.request_timeout);
        Ok((path, builder))
    }

    fn authorized(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.config.credentials.authorization() {
            Some(auth) => builder.header("Authorization", auth),
            None => builder,
        }
    }

    /// Send and fail on any non-2xx status
    pub(crate) async fn send(&self, path: &str, builder: RequestBuilder) -> Result<Response> {
        log::info!("Request to {}", path);
        let resp = builder.send().await?;
        check_status(path, resp).await
    }

    /// Send and decode the JSON body
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<T> {
        let resp = self.send(path, builder).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn get_enveloped<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let (path, builder) = self.call(Method::GET, segments)?;
        let envelope: Envelope = self.send_json(&path, builder).await?;
        envelope.into_result(&path)
    }

    async fn post_enveloped<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: serde_json::Value,
    ) -> Result<T> {
        let (path, builder) = self.call(Method::POST, segments)?;
        let envelope: Envelope = self.send_json(&path, builder.json(&body)).await?;
        envelope.into_result(&path)
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let list: ProjectList = self.get_enveloped(&["api", "ai-portal", "projects"]).await?;
        Ok(list.projects)
    }

    pub async fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        let body: ProjectBody = self
            .post_enveloped(
                &["api", "ai-portal", "projects"],
                json!({ "name": name, "description": description }),
            )
            .await?;
        Ok(body.project)
    }

    pub async fn list_chats(&self, project_id: &str) -> Result<Vec<Chat>> {
        let list: ChatList = self
            .get_enveloped(&["api", "ai-portal", "projects", project_id, "chats"])
            .await?;
        Ok(list.chats)
    }

    pub async fn create_chat(&self, project_id: &str, title: &str, model: &str) -> Result<Chat> {
        let body: ChatBody = self
            .post_enveloped(
                &["api", "ai-portal", "chats"],
                json!({ "projectId": project_id, "title": title, "model": model }),
            )
            .await?;
        Ok(body.chat)
    }

    pub async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        #[derive(serde::Deserialize)]
        struct MessageList {
            #[serde(default)]
            messages: Vec<Message>,
        }

        let list: MessageList = self
            .get_enveloped(&["api", "ai-portal", "chats", chat_id, "messages"])
            .await?;
        Ok(list.messages)
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        let list: AgentList = self.get_enveloped(&["api", "agents"]).await?;
        Ok(list.agents)
    }

    pub async fn create_agent(
        &self,
        name: &str,
        description: &str,
        default_model: &str,
    ) -> Result<Agent> {
        if name.trim().is_empty() {
            return Err(PortalError::invalid_input("agent name must not be empty"));
        }
        let body: AgentBody = self
            .post_enveloped(
                &["api", "agents"],
                json!({ "name": name, "description": description, "defaultModel": default_model }),
            )
            .await?;
        Ok(body.agent)
    }

    /// Plan of the signed-in user; `Free` when the backend does not say
    pub async fn current_plan(&self) -> Result<Plan> {
        let body: UserBody = self.get_enveloped(&["api", "ai-portal", "me"]).await?;
        Ok(body
            .user
            .and_then(|u| u.plan)
            .map(|name| Plan::from_name(&name))
            .unwrap_or_default())
    }
}

/// Pass 2xx responses through; everything else becomes an error carrying
/// the body text
pub(crate) async fn check_status(path: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    log::error!("{} failed with {}: {}", path, status, body);
    Err(PortalError::status(path, status.as_u16(), body))
}

/// Plan-gated endpoints answer `403` when the current plan is too low
pub(crate) fn plan_gate(err: PortalError) -> PortalError {
    match err {
        PortalError::Status { status, .. } if status == StatusCode::FORBIDDEN.as_u16() => {
            PortalError::PlanRequired(PLAN_REQUIRED_MESSAGE.to_string())
        }
        other => other,
    }
}
