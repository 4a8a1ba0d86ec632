//! Chat WebSocket connection and frame handling

use futures::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{parse_frame, Handlers, RealtimeError, CONNECTION_ERROR, DECODE_ERROR};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Open socket for one conversation. Dropping it closes the connection.
pub struct ChatSocket {
    shutdown: Option<oneshot::Sender<()>>,
}

impl ChatSocket {
    /// Connect and start forwarding frames to `handlers`.
    pub async fn connect(url: &url::Url, handlers: Handlers) -> Result<Self, RealtimeError> {
        tracing::info!("Connecting chat socket to {}", redact_token(url));

        let (stream, response) = connect_async(url.as_str()).await?;
        tracing::info!("Chat socket connected (status={})", response.status());

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(read_loop(stream, handlers, shutdown_rx));

        Ok(Self {
            shutdown: Some(shutdown_tx),
        })
    }

    /// Send a close frame and stop the reader.
    pub fn close(mut self) {
        self.signal_shutdown();
    }

    fn signal_shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ChatSocket {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

async fn read_loop(stream: WsStream, handlers: Handlers, mut shutdown: oneshot::Receiver<()>) {
    let (mut sink, mut frames) = stream.split();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!("Chat socket closing on request");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            frame = frames.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("Chat socket recv: {}", text);
                    dispatch(&handlers, parse_frame(&text));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    dispatch(&handlers, serde_json::from_slice(&bytes));
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = sink.send(Message::Pong(data)).await {
                        tracing::warn!("Failed to answer ping: {}", e);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("Chat socket closed by server: {:?}", frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("Chat socket error: {}", e);
                    (handlers.on_error)(CONNECTION_ERROR.to_string());
                    break;
                }
                None => break,
            }
        }
    }
}

fn dispatch(handlers: &Handlers, parsed: Result<super::RealtimePayload, serde_json::Error>) {
    match parsed {
        Ok(payload) => (handlers.on_message)(payload),
        Err(e) => {
            tracing::debug!("Undecodable chat frame: {}", e);
            (handlers.on_error)(DECODE_ERROR.to_string());
        }
    }
}

/// URL for logging, with the access token masked.
fn redact_token(url: &url::Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::{socket_url, RealtimeEvent};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    /// Accept one socket, push `frames`, then close. Yields the request URI.
    async fn serve_frames(frames: Vec<&'static str>) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (uri_tx, uri_rx) = oneshot::channel();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                let _ = uri_tx.send(req.uri().to_string());
                Ok(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(tcp, callback)
                .await
                .unwrap();
            for f in frames {
                ws.send(Message::Text(f.to_string())).await.unwrap();
            }
            let _ = ws.close(None).await;
        });
        (format!("ws://{}/chat", addr), uri_rx)
    }

    #[tokio::test]
    async fn test_malformed_frame_reports_decode_error() {
        let (base, uri_rx) = serve_frames(vec![
            "not json{",
            r#"{"id":"m9","senderType":"visitor","senderName":"Jo","body":"Hello"}"#,
        ])
        .await;
        let url = socket_url(&base, "c1", "rt-token").unwrap();
        let (handlers, mut events) = Handlers::channel();
        let _socket = ChatSocket::connect(&url, handlers).await.unwrap();

        let first = events.recv().await.unwrap();
        assert_eq!(first, RealtimeEvent::Error(DECODE_ERROR.to_string()));

        match events.recv().await.unwrap() {
            RealtimeEvent::Message(p) => {
                assert_eq!(p.id.as_deref(), Some("m9"));
                assert_eq!(p.body, "Hello");
            }
            other => panic!("expected message, got {:?}", other),
        }

        let uri = uri_rx.await.unwrap();
        assert!(uri.contains("conversationId=c1"));
        assert!(uri.contains("token=rt-token"));
    }

    #[tokio::test]
    async fn test_connect_refused_is_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = socket_url(&format!("ws://{}/chat", addr), "c1", "t").unwrap();
        let (handlers, _events) = Handlers::channel();
        assert!(matches!(
            ChatSocket::connect(&url, handlers).await,
            Err(RealtimeError::Connect(_))
        ));
    }

    #[test]
    fn test_redact_token() {
        let url = socket_url("wss://rt.example.com/chat", "c1", "secret").unwrap();
        let shown = redact_token(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("conversationId=c1"));
    }
}
