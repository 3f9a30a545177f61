use crate::common::{ClientConfig, EchoClient};
use crate::{EchoError, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// WebSocket client for the echo server
///
/// Each `send_*` call sends one frame and waits for the server's reply.
///
/// # Examples
///
/// ```no_run
/// use echoharness::websocket::WebSocketEchoClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let addr = "127.0.0.1:8765".parse()?;
///     let mut client = WebSocketEchoClient::connect(addr).await?;
///
///     assert_eq!(client.send_text("ping").await?, "ack");
///     client.close().await?;
///     Ok(())
/// }
/// ```
pub struct WebSocketEchoClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    config: ClientConfig,
}

impl WebSocketEchoClient {
    /// Connect to a server with custom configuration
    pub async fn connect_with_config(addr: SocketAddr, config: ClientConfig) -> Result<Self> {
        let url = format!("ws://{addr}/");
        let (stream, _response) = timeout(config.connect_timeout, connect_async(url))
            .await
            .map_err(|_| EchoError::Timeout("Connection timeout".to_string()))??;
        Ok(Self { stream, config })
    }

    /// Connect with default configuration
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_config(addr, ClientConfig::default()).await
    }

    /// Sends a text frame and returns the reply text
    pub async fn send_text(&mut self, text: &str) -> Result<String> {
        self.send(Message::text(text.to_owned())).await?;
        self.next_reply().await
    }

    /// Sends a binary frame and returns the reply text
    pub async fn send_binary(&mut self, data: &[u8]) -> Result<String> {
        self.send(Message::binary(data.to_vec())).await?;
        self.next_reply().await
    }

    /// Starts the closing handshake and waits for the server to finish it
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        while let Some(message) = self.stream.next().await {
            message?;
        }
        Ok(())
    }

    async fn send(&mut self, message: Message) -> Result<()> {
        timeout(self.config.write_timeout, self.stream.send(message))
            .await
            .map_err(|_| EchoError::Timeout("Write timeout".to_string()))??;
        Ok(())
    }

    async fn next_reply(&mut self) -> Result<String> {
        loop {
            let message = timeout(self.config.read_timeout, self.stream.next())
                .await
                .map_err(|_| EchoError::Timeout("Read timeout".to_string()))?;

            match message {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Binary(data))) => return Ok(String::from_utf8(data.to_vec())?),
                Some(Ok(Message::Close(_))) | None => {
                    return Err(EchoError::WebSocket(
                        tokio_tungstenite::tungstenite::Error::ConnectionClosed,
                    ));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl EchoClient for WebSocketEchoClient {
    /// Sends `data` as a text frame when it is UTF-8, binary otherwise
    async fn echo(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let reply = match std::str::from_utf8(data) {
            Ok(text) => self.send_text(text).await?,
            Err(_) => self.send_binary(data).await?,
        };
        Ok(reply.into_bytes())
    }
}
