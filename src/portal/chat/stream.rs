// SPDX-License-Identifier: MIT

//! Applying a chat stream to a session
//!
//! Policy: lines that fail to parse are logged, counted and skipped; they
//! never abort the turn and never reach the transcript.

use super::session::ChatSession;
use super::sse::{parse_line, LineSplitter, StreamChunk};
use crate::portal::error::StreamError;

/// What one parsed line did to the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The reply grew
    Content,
    /// `[DONE]` arrived
    Finished,
    /// The line was malformed and dropped
    Skipped,
    /// The line arrived after `[DONE]`
    Ignored,
}

/// Running text of one reply
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    buffer: String,
    skipped: usize,
    done: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, chunk: Result<StreamChunk, StreamError>) -> Progress {
        if self.done {
            return Progress::Ignored;
        }

        match chunk {
            Ok(StreamChunk::Delta(text)) => {
                self.buffer.push_str(&text);
                Progress::Content
            }
            Ok(StreamChunk::Done) => {
                self.done = true;
                Progress::Finished
            }
            Err(e) => {
                self.skipped += 1;
                log::warn!("Skipping stream line: {}", e);
                Progress::Skipped
            }
        }
    }

    /// Everything received so far
    pub fn content(&self) -> &str {
        &self.buffer
    }

    /// Lines dropped by the skip policy
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Result of feeding one network read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedOutcome {
    /// The placeholder's content changed
    pub updated: bool,
    /// `[DONE]` was seen; stop reading
    pub finished: bool,
}

/// Drives a session's placeholder from raw response bytes
#[derive(Debug, Default)]
pub struct StreamConsumer {
    splitter: LineSplitter,
    accumulator: StreamAccumulator,
}

impl StreamConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read of the response body
    pub fn feed(&mut self, bytes: &[u8], session: &mut ChatSession) -> FeedOutcome {
        let lines = self.splitter.feed(bytes);
        self.apply_lines(lines, session)
    }

    /// The body ended. A trailing unterminated line is still parsed; a
    /// stream without `[DONE]` settles the turn anyway.
    pub fn finish(&mut self, session: &mut ChatSession) -> FeedOutcome {
        let mut outcome = FeedOutcome::default();
        if let Some(tail) = self.splitter.finish() {
            outcome = self.apply_lines(vec![tail], session);
        }

        if !self.accumulator.is_done() {
            log::warn!("Chat stream ended without {}", super::sse::DONE_SENTINEL);
            session.finish_streaming();
            outcome.finished = true;
        }
        outcome
    }

    pub fn content(&self) -> &str {
        self.accumulator.content()
    }

    pub fn skipped(&self) -> usize {
        self.accumulator.skipped()
    }

    pub fn is_finished(&self) -> bool {
        self.accumulator.is_done()
    }

    fn apply_lines(&mut self, lines: Vec<String>, session: &mut ChatSession) -> FeedOutcome {
        let mut outcome = FeedOutcome::default();

        for line in lines {
            let Some(chunk) = parse_line(&line) else {
                continue;
            };
            match self.accumulator.apply(chunk) {
                Progress::Content => {
                    session.set_reply(self.accumulator.content());
                    outcome.updated = true;
                }
                Progress::Finished => {
                    session.finish_streaming();
                    outcome.finished = true;
                    break;
                }
                Progress::Skipped | Progress::Ignored => {}
            }
        }
        outcome
    }
}
