use super::config::StreamConfig;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpStream;

/// What the connection loop does after a response was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next inbound message
    Continue,
    /// Drop the connection
    Close,
}

/// Trait for connection-oriented echo protocols (HTTP, WebSocket)
///
/// A protocol turns an accepted TCP stream into its own framed stream,
/// yields inbound messages one at a time and writes exactly one response
/// per message. The generic server owns the accept loop, timeouts and
/// connection bookkeeping.
pub trait StreamProtocol: Send + Sync + 'static {
    /// Error type for this protocol
    type Error: Send + std::fmt::Display + Into<crate::EchoError>;
    /// Framed stream produced by the handshake
    type Stream: Send;
    /// One inbound unit (an HTTP request, a WebSocket frame)
    type Inbound: Send;

    /// Wraps or upgrades a freshly accepted TCP stream
    fn handshake(
        &self,
        stream: TcpStream,
        config: &StreamConfig,
    ) -> impl Future<Output = std::result::Result<Self::Stream, Self::Error>> + Send;

    /// Reads the next inbound message, `None` once the peer has closed
    fn receive(
        &self,
        stream: &mut Self::Stream,
    ) -> impl Future<Output = std::result::Result<Option<Self::Inbound>, Self::Error>> + Send;

    /// Writes the response for one inbound message
    fn respond(
        &self,
        stream: &mut Self::Stream,
        addr: SocketAddr,
        inbound: Self::Inbound,
    ) -> impl Future<Output = std::result::Result<Flow, Self::Error>> + Send;
}
