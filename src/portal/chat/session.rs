// SPDX-License-Identifier: MIT

//! Chat transcript and the per-turn state machine
//!
//! A turn moves `Idle -> Sending -> Streaming -> Done`, or ends in
//! `Failed` from `Sending` or `Streaming`. The transcript is the only
//! state; nothing is persisted locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::portal::error::{PortalError, Result};

/// First message of a fresh transcript
pub const GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";

/// Appended when a turn fails
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Set while the reply is still arriving
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Where the current turn stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    /// Request sent, no response body yet
    Sending,
    /// Placeholder visible, content growing
    Streaming,
    Done,
    Failed,
}

/// Body of `POST /api/ai-portal/chat/send`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub chat_id: Option<String>,
    pub messages: Vec<Message>,
    pub model: String,
}

/// One conversation as seen by the client
#[derive(Debug, Clone)]
pub struct ChatSession {
    chat_id: Option<String>,
    model: String,
    messages: Vec<Message>,
    state: TurnState,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            streaming: false,
            timestamp: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl ChatSession {
    /// A new conversation opening with the greeting
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_history(None, model, vec![Message::assistant(GREETING)])
    }

    /// Resume an existing chat
    pub fn with_history(
        chat_id: Option<String>,
        model: impl Into<String>,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            chat_id,
            model: model.into(),
            messages,
            state: TurnState::Idle,
        }
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn set_chat_id(&mut self, chat_id: impl Into<String>) {
        self.chat_id = Some(chat_id.into());
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// True while a turn is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self.state, TurnState::Sending | TurnState::Streaming)
    }

    /// Append the user's message and build the request for this turn.
    /// Blank text and overlapping turns are rejected.
    pub fn begin_turn(&mut self, text: &str) -> Result<ChatRequest> {
        if text.trim().is_empty() {
            return Err(PortalError::invalid_input("message must not be empty"));
        }
        if self.is_loading() {
            return Err(PortalError::invalid_input("a reply is still in progress"));
        }

        self.messages.push(Message::user(text));
        self.state = TurnState::Sending;

        Ok(ChatRequest {
            chat_id: self.chat_id.clone(),
            messages: self.messages.clone(),
            model: self.model.clone(),
        })
    }

    /// Append the empty assistant message the stream will fill
    pub fn start_streaming(&mut self) {
        let mut placeholder = Message::assistant("");
        placeholder.streaming = true;
        self.messages.push(placeholder);
        self.state = TurnState::Streaming;
    }

    /// Replace the placeholder's content with the full text so far
    pub fn set_reply(&mut self, content: &str) {
        if self.state != TurnState::Streaming {
            return;
        }
        if let Some(last) = self.messages.last_mut() {
            last.content = content.to_string();
        }
    }

    /// Clear the streaming marker and settle the turn
    pub fn finish_streaming(&mut self) {
        if self.state != TurnState::Streaming {
            return;
        }
        if let Some(last) = self.messages.last_mut() {
            last.streaming = false;
        }
        self.state = TurnState::Done;
    }

    /// Settle the turn as failed. Whatever streamed so far stays; the
    /// apology is appended after it.
    pub fn fail(&mut self) {
        if self.state == TurnState::Streaming {
            if let Some(last) = self.messages.last_mut() {
                last.streaming = false;
            }
        }

        let mut apology = Message::assistant(APOLOGY);
        apology.timestamp = Some(Utc::now());
        self.messages.push(apology);
        self.state = TurnState::Failed;
    }
}
