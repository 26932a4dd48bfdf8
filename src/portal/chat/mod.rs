// SPDX-License-Identifier: MIT

//! Streaming chat
//!
//! - [`sse`] - `data:` line parsing and read reassembly
//! - [`stream`] - skip-and-log accumulation into a session
//! - [`session`] - transcript and turn state machine
//! - [`client`] - the HTTP send loop

pub mod client;
pub mod session;
pub mod sse;
pub mod stream;

pub use client::ChatEvent;
pub use session::{ChatRequest, ChatSession, Message, Role, TurnState, APOLOGY, GREETING};
pub use sse::{parse_line, LineSplitter, StreamChunk};
pub use stream::{StreamAccumulator, StreamConsumer};
