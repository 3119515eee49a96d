//! Wire events for a streamed chat turn.
//!
//! One logical turn serializes to zero or more `content` events followed by
//! exactly one terminal event, `done` or `error`, never both.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// A partial content delta.
    Content { content: String },
    /// The turn finished cleanly.
    Done,
    /// The turn aborted; no further events follow.
    Error { error: String },
}

impl StreamEvent {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content {
            content: text.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Content { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_event_shape() {
        let json = serde_json::to_string(&StreamEvent::content("Hello")).unwrap();
        assert_eq!(json, r#"{"type":"content","content":"Hello"}"#);
    }

    #[test]
    fn done_event_shape() {
        let json = serde_json::to_string(&StreamEvent::Done).unwrap();
        assert_eq!(json, r#"{"type":"done"}"#);
    }

    #[test]
    fn error_event_shape() {
        let json = serde_json::to_string(&StreamEvent::error("boom")).unwrap();
        assert_eq!(json, r#"{"type":"error","error":"boom"}"#);
    }

    #[test]
    fn terminal_classification() {
        assert!(!StreamEvent::content("x").is_terminal());
        assert!(StreamEvent::Done.is_terminal());
        assert!(StreamEvent::error("x").is_terminal());
    }
}
