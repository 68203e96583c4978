//! The real-time channel seam.
//!
//! [`Transport`] abstracts "given a conversation key, open a bidirectional
//! frame channel" so the connection state machine can be driven by
//! in-memory channels in tests. [`WsTransport`] is the production
//! implementation over tokio-tungstenite.
//!
//! Frames are JSON text, one message per frame, in both directions. No
//! acknowledgement or backpressure protocol is assumed; delivery is
//! fire-and-forget both ways.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tracing::debug;

use charla_core::{ChatError, ConversationKey, Result, SessionContext};
use charla_settings::ApiSettings;

/// Outbound half of a channel: JSON text frames in, transport errors out.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = ChatError> + Send>>;

/// Inbound half of a channel. Ends when the peer closes or the transport
/// fails; an `Err` item reports the failure before the end.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Opens the real-time channel for a conversation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect the channel for `key`. Resolves once the handshake
    /// completes.
    async fn open(&self, key: ConversationKey) -> Result<(FrameSink, FrameStream)>;
}

/// WebSocket transport over tokio-tungstenite.
pub struct WsTransport {
    ws_base: String,
    token: String,
}

impl WsTransport {
    /// Build a transport from API settings and the caller's session.
    pub fn new(settings: &ApiSettings, session: &SessionContext) -> Self {
        Self {
            ws_base: settings.ws_base_url.clone(),
            token: session.token().to_owned(),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, key: ConversationKey) -> Result<(FrameSink, FrameStream)> {
        let url = charla_api::channel_url(&self.ws_base, key, &self.token);
        let (ws, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| ChatError::Connection(e.to_string()))?;
        debug!(%key, "channel handshake complete");

        let (sink, stream) = ws.split();
        let sink = sink
            .with(|text: String| {
                future::ready(Ok::<WsMessage, tungstenite::Error>(WsMessage::text(text)))
            })
            .sink_map_err(|e| ChatError::Connection(e.to_string()));
        // Ping/pong and close handshakes are handled inside tungstenite;
        // only text frames carry messages.
        let stream = stream.filter_map(|item| {
            future::ready(match item {
                Ok(WsMessage::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(_) => None,
                Err(e) => Some(Err(ChatError::Connection(e.to_string()))),
            })
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}
