use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for stream-based echo servers
///
/// Shared by every protocol driven through [`StreamEchoServer`](super::StreamEchoServer).
/// Protocol-specific configs convert into this one with `From`.
///
/// # Examples
///
/// ```
/// use echoharness::stream::StreamConfig;
/// use std::time::Duration;
///
/// let config = StreamConfig {
///     bind_addr: "127.0.0.1:8080".parse().unwrap(),
///     max_connections: Some(100),
///     max_request_size: 64 * 1024,
///     read_timeout: Some(Duration::from_secs(30)),
///     write_timeout: Duration::from_secs(30),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Maximum number of concurrent connections, `None` for unbounded
    pub max_connections: Option<usize>,
    /// Largest request or message accepted, in bytes
    pub max_request_size: usize,
    /// Idle time allowed between two inbound messages, `None` waits forever
    pub read_timeout: Option<Duration>,
    /// Write timeout for responses
    pub write_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            max_connections: None,
            max_request_size: 1024 * 1024,
            read_timeout: None,
            write_timeout: Duration::from_secs(30),
        }
    }
}
