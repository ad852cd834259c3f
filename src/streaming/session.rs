//! Per-request stream state

use super::{StreamEvent, StreamUpdate};

/// Accumulated answer of one streaming request.
///
/// Text only grows between `start` and the terminal event; once the session
/// is inactive, nothing changes it anymore.
#[derive(Debug, Clone)]
pub struct StreamSession {
    active: bool,
    accumulated: String,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            active: true,
            accumulated: String::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Apply a decoded event; returns what the caller should see, if anything
    pub fn apply(&mut self, event: StreamEvent) -> Option<StreamUpdate> {
        if !self.active {
            return None;
        }

        match event {
            StreamEvent::Start { .. } => {
                self.accumulated.clear();
                None
            }
            StreamEvent::Chunk { content } => {
                self.accumulated.push_str(&content);
                Some(StreamUpdate::Chunk {
                    fragment: content,
                    accumulated: self.accumulated.clone(),
                })
            }
            StreamEvent::Complete { payload } => {
                self.active = false;
                Some(StreamUpdate::Complete(payload))
            }
            StreamEvent::Error { message } => {
                self.active = false;
                Some(StreamUpdate::Error(message))
            }
        }
    }

    /// Transport failure
    pub fn fail(&mut self, message: impl Into<String>) -> Option<StreamUpdate> {
        if !self.active {
            return None;
        }
        self.active = false;
        Some(StreamUpdate::Error(message.into()))
    }

    /// Explicit stop or end of body: no update
    pub fn stop(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(s: &str) -> StreamEvent {
        StreamEvent::Chunk {
            content: s.to_string(),
        }
    }

    #[test]
    fn test_chunks_accumulate() {
        let mut session = StreamSession::new();
        let first = session.apply(chunk("ab"));
        let second = session.apply(chunk("cd"));

        assert_eq!(
            first,
            Some(StreamUpdate::Chunk {
                fragment: "ab".into(),
                accumulated: "ab".into()
            })
        );
        assert_eq!(
            second,
            Some(StreamUpdate::Chunk {
                fragment: "cd".into(),
                accumulated: "abcd".into()
            })
        );
    }

    #[test]
    fn test_start_resets_text() {
        let mut session = StreamSession::new();
        session.apply(chunk("stale"));
        assert!(session.apply(StreamEvent::Start { meta: json!({}) }).is_none());
        assert_eq!(session.accumulated(), "");
    }

    #[test]
    fn test_nothing_changes_after_terminal_event() {
        let mut session = StreamSession::new();
        session.apply(chunk("done"));
        let complete = session.apply(StreamEvent::Complete {
            payload: json!({"type": "complete"}),
        });
        assert!(matches!(complete, Some(StreamUpdate::Complete(_))));
        assert!(!session.is_active());

        assert!(session.apply(chunk("late")).is_none());
        assert!(session.fail("late failure").is_none());
        assert_eq!(session.accumulated(), "done");
    }

    #[test]
    fn test_error_is_terminal() {
        let mut session = StreamSession::new();
        let update = session.apply(StreamEvent::Error {
            message: "boom".into(),
        });
        assert_eq!(update, Some(StreamUpdate::Error("boom".into())));
        assert!(!session.is_active());
    }

    #[test]
    fn test_stop_is_silent() {
        let mut session = StreamSession::new();
        session.apply(chunk("x"));
        session.stop();
        assert!(session.apply(chunk("y")).is_none());
        assert_eq!(session.accumulated(), "x");
    }
}
