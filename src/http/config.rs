use super::protocol::DEFAULT_ROUTE;
use crate::stream::StreamConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the HTTP echo server
///
/// Extends `StreamConfig` with the echo route and the `Server` header.
///
/// # Examples
///
/// ```rust
/// use echoharness::http::HttpConfig;
///
/// let config = HttpConfig {
///     bind_addr: "127.0.0.1:8080".parse().unwrap(),
///     ..HttpConfig::default()
/// };
/// assert_eq!(config.route, "/api/Tags/tag-crime");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Network address to bind to
    pub bind_addr: SocketAddr,
    /// Maximum number of concurrent connections, `None` for unbounded
    pub max_connections: Option<usize>,
    /// Largest request (head plus body) accepted, in bytes
    pub max_request_size: usize,
    /// Idle keep-alive timeout between requests
    pub read_timeout: Option<Duration>,
    /// Write timeout for responses
    pub write_timeout: Duration,
    /// The single path answered with an echo
    pub route: String,
    /// `Server` header value, omitted when `None`
    pub server_name: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 80)),
            max_connections: None,
            max_request_size: 1024 * 1024,
            read_timeout: Some(Duration::from_secs(30)),
            write_timeout: Duration::from_secs(30),
            route: DEFAULT_ROUTE.to_string(),
            server_name: Some(format!("echoharness/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl From<HttpConfig> for StreamConfig {
    fn from(config: HttpConfig) -> Self {
        Self {
            bind_addr: config.bind_addr,
            max_connections: config.max_connections,
            max_request_size: config.max_request_size,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        }
    }
}
