// SPDX-License-Identifier: MIT

//! Streaming chat turns over HTTP

use futures::StreamExt;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::session::{ChatRequest, ChatSession};
use super::stream::StreamConsumer;
use crate::portal::api::PortalClient;
use crate::portal::error::Result;

const CHAT_SEND_PATH: &str = "/api/ai-portal/chat/send";

/// Progress of a chat turn, for observers that render it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ChatEvent {
    /// The placeholder reply was appended
    Started,
    /// Full reply text so far
    Content(String),
    Done,
    Error(String),
}

impl PortalClient {
    /// Send `text` as the next user message and stream the reply into
    /// `session`.
    ///
    /// Returns the final reply. On failure the session ends with the
    /// apology message and the error is returned; nothing is retried.
    pub async fn send_chat(
        &self,
        session: &mut ChatSession,
        text: &str,
        events: Option<&mpsc::Sender<ChatEvent>>,
    ) -> Result<String> {
        let request = session.begin_turn(text)?;

        match self.stream_reply(session, &request, events).await {
            Ok(reply) => {
                emit(events, ChatEvent::Done).await;
                Ok(reply)
            }
            Err(e) => {
                log::error!("Chat error: {}", e);
                session.fail();
                emit(events, ChatEvent::Error(e.to_string())).await;
                Err(e)
            }
        }
    }

    async fn stream_reply(
        &self,
        session: &mut ChatSession,
        request: &ChatRequest,
        events: Option<&mpsc::Sender<ChatEvent>>,
    ) -> Result<String> {
        let builder = self.request(Method::POST, CHAT_SEND_PATH)?.json(request);
        let resp = self.send(CHAT_SEND_PATH, builder).await?;

        session.start_streaming();
        emit(events, ChatEvent::Started).await;

        let mut consumer = StreamConsumer::new();
        let mut body = resp.bytes_stream();

        while let Some(read) = body.next().await {
            let bytes = read?;
            let outcome = consumer.feed(&bytes, session);
            if outcome.updated {
                emit(events, ChatEvent::Content(consumer.content().to_string())).await;
            }
            if outcome.finished {
                break;
            }
        }

        if !consumer.is_finished() {
            let outcome = consumer.finish(session);
            if outcome.updated {
                emit(events, ChatEvent::Content(consumer.content().to_string())).await;
            }
        }

        if consumer.skipped() > 0 {
            log::warn!("Dropped {} malformed stream lines", consumer.skipped());
        }
        Ok(consumer.content().to_string())
    }
}

async fn emit(events: Option<&mpsc::Sender<ChatEvent>>, event: ChatEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
