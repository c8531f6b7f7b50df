//! WebSocket messages and the JSON envelopes the harness sends.

use serde::Serialize;
use serde_json::Value;

/// A complete (reassembled) WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A text message (UTF-8 encoded).
    Text(String),
    /// A binary message (arbitrary bytes).
    Binary(Vec<u8>),
    /// A ping frame; the connection has already queued the pong.
    Ping(Vec<u8>),
    /// A pong frame.
    Pong(Vec<u8>),
    /// A close frame with its status code, if one was given.
    Close(Option<u16>),
}

impl Message {
    /// Create a text message.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Text(s.into())
    }

    #[must_use]
    pub fn is_control(&self) -> bool {
        matches!(self, Message::Ping(_) | Message::Pong(_) | Message::Close(_))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Message::Text(text) => text.len(),
            Message::Binary(data) | Message::Ping(data) | Message::Pong(data) => data.len(),
            Message::Close(_) => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// At most `max_chars` characters of the message for progress output.
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> String {
        match self {
            Message::Text(text) => {
                let mut out: String = text.chars().take(max_chars).collect();
                if text.chars().count() > max_chars {
                    out.push_str("...");
                }
                out
            }
            Message::Binary(data) => format!("<{} bytes binary>", data.len()),
            Message::Ping(_) => "<ping>".to_string(),
            Message::Pong(_) => "<pong>".to_string(),
            Message::Close(code) => format!("<close {:?}>", code),
        }
    }
}

/// Client-to-server messages understood by the target's `/ws/*` routes.
///
/// Serialized as JSON objects tagged by a lowercase `type` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Auth {
        token: String,
    },
    Subscribe {
        channel: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<Value>,
    },
    /// Terminal only.
    Resize { cols: u16, rows: u16 },
    /// Terminal only.
    Input { data: String },
}

impl ClientMessage {
    #[must_use]
    pub fn auth(token: impl Into<String>) -> Self {
        ClientMessage::Auth {
            token: token.into(),
        }
    }

    #[must_use]
    pub fn subscribe(channel: impl Into<String>) -> Self {
        ClientMessage::Subscribe {
            channel: channel.into(),
            options: None,
        }
    }

    #[must_use]
    pub fn subscribe_with(channel: impl Into<String>, options: Value) -> Self {
        ClientMessage::Subscribe {
            channel: channel.into(),
            options: Some(options),
        }
    }

    #[must_use]
    pub fn resize(cols: u16, rows: u16) -> Self {
        ClientMessage::Resize { cols, rows }
    }

    #[must_use]
    pub fn input(data: impl Into<String>) -> Self {
        ClientMessage::Input { data: data.into() }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_value(msg: &ClientMessage) -> Value {
        serde_json::from_str(&msg.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_auth_envelope() {
        assert_eq!(
            as_value(&ClientMessage::auth("abc")),
            json!({"type": "auth", "token": "abc"})
        );
    }

    #[test]
    fn test_subscribe_without_options() {
        assert_eq!(
            as_value(&ClientMessage::subscribe("metrics")),
            json!({"type": "subscribe", "channel": "metrics"})
        );
    }

    #[test]
    fn test_subscribe_with_options() {
        assert_eq!(
            as_value(&ClientMessage::subscribe_with("logs", json!({"lines": 10}))),
            json!({"type": "subscribe", "channel": "logs", "options": {"lines": 10}})
        );
    }

    #[test]
    fn test_terminal_envelopes() {
        assert_eq!(
            as_value(&ClientMessage::resize(120, 40)),
            json!({"type": "resize", "cols": 120, "rows": 40})
        );
        assert_eq!(
            as_value(&ClientMessage::input("echo 'test'\n")),
            json!({"type": "input", "data": "echo 'test'\n"})
        );
    }

    #[test]
    fn test_preview_truncates_text() {
        let msg = Message::text("a".repeat(150));
        let preview = msg.preview(100);
        assert_eq!(preview.len(), 103);
        assert!(preview.ends_with("..."));

        assert_eq!(Message::text("short").preview(100), "short");
    }

    #[test]
    fn test_preview_non_text() {
        assert_eq!(Message::Binary(vec![0; 4]).preview(100), "<4 bytes binary>");
        assert_eq!(Message::Close(Some(1000)).preview(100), "<close Some(1000)>");
    }

    #[test]
    fn test_is_control() {
        assert!(Message::Ping(vec![]).is_control());
        assert!(Message::Close(None).is_control());
        assert!(!Message::text("x").is_control());
    }
}
