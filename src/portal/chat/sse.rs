// SPDX-License-Identifier: MIT

//! Event-stream line handling for chat responses
//!
//! The chat endpoint answers with lines of the form
//! `data: {"content": "..."}` and a final `data: [DONE]`.

use serde_json::Value;

use crate::portal::error::StreamError;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded `data:` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Next piece of the assistant's reply
    Delta(String),
    /// End of the reply
    Done,
}

/// Parse one line. Lines that are not `data:` lines yield `None`.
pub fn parse_line(line: &str) -> Option<Result<StreamChunk, StreamError>> {
    let payload = line.trim_end_matches('\r').strip_prefix(DATA_PREFIX)?;
    Some(parse_payload(payload))
}

fn parse_payload(payload: &str) -> Result<StreamChunk, StreamError> {
    if payload == DONE_SENTINEL {
        return Ok(StreamChunk::Done);
    }

    let value: Value = serde_json::from_str(payload).map_err(|source| StreamError::Malformed {
        payload: payload.to_string(),
        source,
    })?;

    match value.get("content").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => Ok(StreamChunk::Delta(text.to_string())),
        _ => Err(StreamError::MissingContent(payload.to_string())),
    }
}

/// Splits network reads into complete lines.
///
/// A line cut off at the end of one read is held back and completed by the
/// next read. Lines are decoded only once complete, so multi-byte
/// characters split across reads survive.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read and take every line it completes
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    /// Take whatever is left once the stream has ended
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}
