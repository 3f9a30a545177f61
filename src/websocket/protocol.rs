use crate::stream::{Flow, StreamConfig, StreamProtocol};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig as TransportConfig;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{WebSocketStream, accept_async_with_config};
use tracing::{debug, info};

/// Acknowledgment text sent for every received frame
pub const DEFAULT_ACK: &str = "ack";

#[derive(Debug, thiserror::Error)]
pub enum WebSocketProtocolError {
    #[error("WebSocket transport error: {0}")]
    Transport(#[from] tungstenite::Error),
}

/// One data frame received from a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebSocketInbound {
    Text(String),
    Binary(Bytes),
}

/// WebSocket protocol implementation for the echo server
///
/// Logs each data frame and replies with a fixed text frame. Control
/// frames are left to the transport: pings get pongs, a client close is
/// answered and ends the loop. The server never starts a close itself.
#[derive(Debug, Clone)]
pub struct WebSocketProtocol {
    ack: String,
}

impl WebSocketProtocol {
    pub fn new(ack: impl Into<String>) -> Self {
        Self { ack: ack.into() }
    }

    pub fn ack(&self) -> &str {
        &self.ack
    }
}

impl Default for WebSocketProtocol {
    fn default() -> Self {
        Self::new(DEFAULT_ACK)
    }
}

impl StreamProtocol for WebSocketProtocol {
    type Error = WebSocketProtocolError;
    type Stream = WebSocketStream<TcpStream>;
    type Inbound = WebSocketInbound;

    async fn handshake(
        &self,
        stream: TcpStream,
        config: &StreamConfig,
    ) -> Result<Self::Stream, WebSocketProtocolError> {
        let mut transport = TransportConfig::default();
        transport.max_message_size = Some(config.max_request_size);
        transport.max_frame_size = Some(config.max_request_size);
        Ok(accept_async_with_config(stream, Some(transport)).await?)
    }

    async fn receive(
        &self,
        stream: &mut Self::Stream,
    ) -> Result<Option<WebSocketInbound>, WebSocketProtocolError> {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    return Ok(Some(WebSocketInbound::Text(text.as_str().to_owned())));
                }
                Ok(Message::Binary(data)) => return Ok(Some(WebSocketInbound::Binary(data))),
                Ok(Message::Close(frame)) => {
                    // Keep polling so the close reply gets flushed
                    debug!(?frame, "Client sent close frame");
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => {
                    debug!("Client dropped connection without closing handshake");
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    async fn respond(
        &self,
        stream: &mut Self::Stream,
        addr: SocketAddr,
        inbound: WebSocketInbound,
    ) -> Result<Flow, WebSocketProtocolError> {
        match &inbound {
            WebSocketInbound::Text(text) => info!(%addr, text = %text, "RX"),
            WebSocketInbound::Binary(data) => info!(%addr, size = data.len(), "RX binary"),
        }

        stream.send(Message::text(self.ack.clone())).await?;
        Ok(Flow::Continue)
    }
}
