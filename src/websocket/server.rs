use super::config::WebSocketConfig;
use super::protocol::WebSocketProtocol;
use crate::stream::StreamEchoServer;

/// WebSocket echo server
///
/// This is a type alias for `StreamEchoServer<WebSocketProtocol>`.
///
/// # Examples
///
/// ```no_run
/// use echoharness::common::EchoServerTrait;
/// use echoharness::websocket::{WebSocketConfig, WebSocketEchoServer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = WebSocketEchoServer::from_config(WebSocketConfig::default());
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub type WebSocketEchoServer = StreamEchoServer<WebSocketProtocol>;

impl StreamEchoServer<WebSocketProtocol> {
    /// Builds the server and its protocol from one `WebSocketConfig`
    pub fn from_config(config: WebSocketConfig) -> Self {
        let protocol = WebSocketProtocol::new(config.ack.clone());
        Self::new(config.into(), protocol)
    }
}
