//! Push channel: server-to-client record notifications.
//!
//! A persistent duplex connection that authorizes with the bearer token as
//! its first message and then receives `{type, payload}` frames whenever a
//! record is created or updated elsewhere. Frame parsing is tolerant:
//! unrecognized shapes are skipped, never errors.

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::models::Book;
use crate::transport::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What happened to the record carried by a push frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushKind {
    Created,
    Updated,
    /// Any other frame type; carried through so callers can log and ignore it
    Other(String),
}

/// A parsed push-channel frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub kind: PushKind,
    pub book: Book,
}

#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
    payload: serde_json::Value,
}

/// Parse a raw frame; `None` for anything that isn't `{type, payload: Record}`.
#[must_use]
pub fn parse_frame(raw: &str) -> Option<PushMessage> {
    let frame: Frame = serde_json::from_str(raw).ok()?;
    let book: Book = serde_json::from_value(frame.payload).ok()?;
    let kind = match frame.kind.as_str() {
        "created" => PushKind::Created,
        "updated" => PushKind::Updated,
        other => PushKind::Other(other.to_string()),
    };
    Some(PushMessage { kind, book })
}

/// Derive the push-channel URL from the server base URL.
#[must_use]
pub fn websocket_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    }
}

/// An open push channel.
pub struct PushChannel {
    stream: WsStream,
}

impl PushChannel {
    /// Connect and authorize with the token as the first message.
    pub async fn connect(url: &str, token: &str) -> Result<Self, TransportError> {
        tracing::debug!(url, "connecting push channel");
        let (mut stream, _) = connect_async(url)
            .await
            .map_err(|error| TransportError::Unreachable(error.to_string()))?;

        let authorization = json!({
            "type": "authorization",
            "payload": { "token": token },
        });
        stream
            .send(Message::Text(authorization.to_string()))
            .await
            .map_err(|error| TransportError::Unreachable(error.to_string()))?;

        Ok(Self { stream })
    }

    /// Next parsed message; unrecognized frames are skipped. `None` once the
    /// connection closes or errors.
    pub async fn next_message(&mut self) -> Option<PushMessage> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    if let Some(message) = parse_frame(&text) {
                        return Some(message);
                    }
                    tracing::debug!("ignoring unrecognized push frame");
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!("push channel closed by server");
                    return None;
                }
                // pings are answered by tungstenite; other frames carry no records
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(%error, "push channel read failed");
                    return None;
                }
            }
        }
    }

    /// Close the channel.
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
