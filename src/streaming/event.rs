//! Decoding of `data: <json>` event blocks

use serde_json::Value;
use thiserror::Error;

const DATA_PREFIX: &str = "data: ";

/// One event of the chat stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Answer generation started; carries the server's metadata
    Start { meta: Value },
    /// Next fragment of the answer
    Chunk { content: String },
    /// Answer finished; the whole payload is handed on untouched
    Complete { payload: Value },
    /// Server-side failure
    Error { message: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }
}

/// Why a block was skipped. None of these end the stream.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("block does not start with 'data: '")]
    MissingPrefix,

    #[error("block is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown event type '{0}'")]
    UnknownType(String),

    #[error("event is missing field '{0}'")]
    MissingField(&'static str),
}

/// Decode one delimiter-free block. `Ok(None)` for blank blocks.
pub fn decode_block(block: &[u8]) -> Result<Option<StreamEvent>, FrameError> {
    let text = std::str::from_utf8(block)?;
    if text.trim().is_empty() {
        return Ok(None);
    }

    let data = text
        .trim_start_matches(['\r', '\n'])
        .strip_prefix(DATA_PREFIX)
        .ok_or(FrameError::MissingPrefix)?;
    let json: Value = serde_json::from_str(data)?;

    let event_type = json["type"]
        .as_str()
        .ok_or(FrameError::MissingField("type"))?;

    let event = match event_type {
        "start" => StreamEvent::Start { meta: json },
        "chunk" => {
            let content = json["content"]
                .as_str()
                .ok_or(FrameError::MissingField("content"))?;
            StreamEvent::Chunk {
                content: content.to_string(),
            }
        }
        "complete" => StreamEvent::Complete { payload: json },
        "error" => {
            let message = json["message"].as_str().unwrap_or("Unknown error");
            StreamEvent::Error {
                message: message.to_string(),
            }
        }
        other => return Err(FrameError::UnknownType(other.to_string())),
    };

    Ok(Some(event))
}
