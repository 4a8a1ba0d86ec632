//! Live chat relay over WebSocket
//!
//! One socket per open conversation. Inbound frames are plain JSON message
//! payloads; they are parsed here and forwarded to caller-supplied handlers.
//! There is no reconnection: callers reconnect by opening a new socket.

mod websocket;

pub use websocket::ChatSocket;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::mpsc;
use url::Url;

use crate::models::{Message, SenderType};

/// Reported through `on_error` when a frame is not a valid payload.
pub const DECODE_ERROR: &str = "Could not decode realtime chat message";
/// Reported through `on_error` when the socket itself fails.
pub const CONNECTION_ERROR: &str = "Realtime chat connection error";

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("Invalid chat socket URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Chat socket connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
}

/// One inbound chat frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimePayload {
    #[serde(default)]
    pub id: Option<String>,
    pub sender_type: SenderType,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RealtimePayload {
    /// Materialize as a stored message, filling in id and time when absent.
    pub fn into_message(self, conversation_id: &str) -> Message {
        let sender_name = self.sender_name.unwrap_or_else(|| match self.sender_type {
            SenderType::Visitor => "Visitor".to_string(),
            SenderType::Manager => "Manager".to_string(),
            SenderType::Bot => "Assistant".to_string(),
            SenderType::System => "System".to_string(),
        });
        Message {
            id: self
                .id
                .unwrap_or_else(|| format!("rt-{}", uuid::Uuid::new_v4())),
            conversation_id: conversation_id.to_string(),
            sender_type: self.sender_type,
            sender_name,
            body: self.body,
            photo_url: self.photo_url,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Parse a text frame into a payload.
pub fn parse_frame(text: &str) -> Result<RealtimePayload, serde_json::Error> {
    serde_json::from_str(text)
}

/// What the socket reader reports back to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    Message(RealtimePayload),
    Error(String),
}

type MessageHandler = Box<dyn Fn(RealtimePayload) + Send + Sync>;
type ErrorHandler = Box<dyn Fn(String) + Send + Sync>;

/// Callbacks invoked from the socket reader task.
pub struct Handlers {
    pub on_message: MessageHandler,
    pub on_error: ErrorHandler,
}

impl Handlers {
    pub fn new<M, E>(on_message: M, on_error: E) -> Self
    where
        M: Fn(RealtimePayload) + Send + Sync + 'static,
        E: Fn(String) + Send + Sync + 'static,
    {
        Self {
            on_message: Box::new(on_message),
            on_error: Box::new(on_error),
        }
    }

    /// Handlers that forward everything into a channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RealtimeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let err_tx = tx.clone();
        let handlers = Self::new(
            move |payload| {
                let _ = tx.send(RealtimeEvent::Message(payload));
            },
            move |error| {
                let _ = err_tx.send(RealtimeEvent::Error(error));
            },
        );
        (handlers, rx)
    }
}

/// Swap an http(s) scheme for its WebSocket counterpart. Other schemes pass through.
fn use_ws_scheme(url: &mut Url) {
    let ws = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        _ => return,
    };
    // http(s) and ws(s) are all special schemes, so the swap cannot fail.
    let _ = url.set_scheme(ws);
}

/// Socket base derived from the API base: `http(s)://host/x` -> `ws(s)://host/x/chat`.
pub fn default_socket_base(api_base: &str) -> String {
    let trimmed = api_base.trim_end_matches('/');
    let Ok(mut url) = Url::parse(trimmed) else {
        return format!("{}/chat", trimmed);
    };
    use_ws_scheme(&mut url);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("chat");
    }
    url.to_string()
}

/// Full socket URL with conversation id and access token as query parameters.
pub fn socket_url(
    base: &str,
    conversation_id: &str,
    access_token: &str,
) -> Result<Url, RealtimeError> {
    let invalid = |message: String| RealtimeError::InvalidUrl {
        url: base.to_string(),
        message,
    };
    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    use_ws_scheme(&mut url);
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    url.query_pairs_mut()
        .append_pair("conversationId", conversation_id)
        .append_pair("token", access_token);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_frame() {
        let p = parse_frame(
            r#"{"id":"m1","senderType":"visitor","senderName":"Jo","body":"Hi","photoUrl":"https://cdn/x.jpg","createdAt":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(p.id.as_deref(), Some("m1"));
        assert_eq!(p.sender_type, SenderType::Visitor);
        assert_eq!(p.photo_url.as_deref(), Some("https://cdn/x.jpg"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_frame("not json{").is_err());
        assert!(parse_frame(r#"{"body":"no sender"}"#).is_err());
    }

    #[test]
    fn test_into_message_fills_missing_fields() {
        let p = parse_frame(r#"{"senderType":"bot","body":"Hello"}"#).unwrap();
        let m = p.into_message("c1");
        assert!(m.id.starts_with("rt-"));
        assert_eq!(m.conversation_id, "c1");
        assert_eq!(m.sender_name, "Assistant");
    }

    #[test]
    fn test_default_socket_base() {
        assert_eq!(
            default_socket_base("https://bff.example.com/api/"),
            "wss://bff.example.com/api/chat"
        );
        assert_eq!(default_socket_base("http://localhost:8787"), "ws://localhost:8787/chat");
    }

    #[test]
    fn test_socket_url_carries_query() {
        let url = socket_url("wss://rt.example.com/chat", "conv 1", "tok&x").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("conversationId".to_string(), "conv 1".to_string()),
                ("token".to_string(), "tok&x".to_string()),
            ]
        );
    }

    #[test]
    fn test_socket_url_keeps_existing_query() {
        let url = socket_url(
            "wss://rt.example.com/chat?origin=https://app.example.com",
            "c1",
            "t",
        )
        .unwrap();
        let origin: Vec<String> = url
            .query_pairs()
            .filter(|(k, _)| k == "origin")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(origin, vec!["https://app.example.com"]);
        assert!(url.query_pairs().any(|(k, v)| k == "conversationId" && v == "c1"));
    }

    #[test]
    fn test_socket_url_maps_http_scheme_only() {
        let url = socket_url("https://bff.example.com/chat?next=http://x", "c1", "t").unwrap();
        assert_eq!(url.scheme(), "wss");
        assert!(url.query_pairs().any(|(k, v)| k == "next" && v == "http://x"));
    }

    #[test]
    fn test_socket_url_rejects_other_schemes() {
        assert!(socket_url("ftp://rt.example.com", "c", "t").is_err());
    }
}
