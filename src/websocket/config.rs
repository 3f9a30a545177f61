use super::protocol::DEFAULT_ACK;
use crate::stream::StreamConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the WebSocket echo server
///
/// Connections have no idle timeout by default: they stay open until the
/// client closes them or the transport fails.
///
/// # Examples
///
/// ```rust
/// use echoharness::websocket::WebSocketConfig;
///
/// let config = WebSocketConfig::default();
/// assert_eq!(config.bind_addr.port(), 8765);
/// assert_eq!(config.ack, "ack");
/// ```
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Network address to bind to
    pub bind_addr: SocketAddr,
    /// Maximum number of concurrent connections, `None` for unbounded
    pub max_connections: Option<usize>,
    /// Largest message accepted, in bytes
    pub max_message_size: usize,
    /// Idle time allowed between frames, `None` waits forever
    pub read_timeout: Option<Duration>,
    /// Write timeout for acknowledgments
    pub write_timeout: Duration,
    /// Text sent back for every received frame
    pub ack: String,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8765)),
            max_connections: None,
            max_message_size: 16 * 1024 * 1024,
            read_timeout: None,
            write_timeout: Duration::from_secs(30),
            ack: DEFAULT_ACK.to_string(),
        }
    }
}

impl From<WebSocketConfig> for StreamConfig {
    fn from(config: WebSocketConfig) -> Self {
        Self {
            bind_addr: config.bind_addr,
            max_connections: config.max_connections,
            max_request_size: config.max_message_size,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        }
    }
}
