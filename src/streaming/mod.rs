//! Streaming chat answers
//!
//! The backend answers `POST /streaming/chat` with a chunked body of
//! `data: <json>\n\n` events (`start`, `chunk`, `complete`, `error`).
//! [`StreamConsumer`] reads that body on a background task, reassembles
//! events across network reads, and hands the caller a [`StreamHandle`]
//! yielding [`StreamUpdate`]s in server order.

mod consumer;
mod event;
mod framing;
mod session;

pub use consumer::{StreamConsumer, StreamHandle};
pub use event::{decode_block, FrameError, StreamEvent};
pub use framing::EventFramer;
pub use session::StreamSession;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("A stream is already active on this consumer")]
    AlreadyActive,

    #[error("Streaming requires a running tokio runtime")]
    NoRuntime,
}

/// Body of the streaming chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamRequest {
    pub conversation_id: i64,
    pub question: String,
}

impl ChatStreamRequest {
    pub fn new(conversation_id: i64, question: impl Into<String>) -> Self {
        Self {
            conversation_id,
            question: question.into(),
        }
    }
}

/// What a caller sees of a stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdate {
    /// A new fragment and the answer so far
    Chunk { fragment: String, accumulated: String },
    /// Final payload from the server (`full_answer`, message id, ...)
    Complete(Value),
    /// Server-reported or transport failure
    Error(String),
}

impl StreamUpdate {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamUpdate::Complete(_) | StreamUpdate::Error(_))
    }
}

/// How a stream ended
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    Completed(Value),
    Failed(String),
    /// Body ended without a terminal event, or the stream was stopped
    Ended,
}

/// Callback-style consumption of a [`StreamHandle`]
pub trait StreamObserver {
    fn on_chunk(&mut self, _fragment: &str, _accumulated: &str) {}
    fn on_complete(&mut self, _payload: &Value) {}
    fn on_error(&mut self, _message: &str) {}
}

/// Observer that ignores everything
impl StreamObserver for () {}
