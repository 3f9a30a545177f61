use crate::{EchoError, Result};
use async_trait::async_trait;

/// Common trait for echo servers
///
/// Implemented by every server built on
/// [`StreamEchoServer`](crate::stream::StreamEchoServer).
#[async_trait]
pub trait EchoServerTrait {
    /// Starts the echo server and listens for connections
    async fn run(&self) -> Result<()>;

    /// Returns a shutdown signal sender that can be used to gracefully shutdown the server
    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()>;
}

/// Common trait for echo clients
///
/// `echo` sends one payload and returns whatever the server reflected:
/// the JSON description for HTTP, the acknowledgment for WebSocket.
#[async_trait]
pub trait EchoClient {
    /// Sends data to the echo server and returns the response payload
    async fn echo(&mut self, data: &[u8]) -> Result<Vec<u8>>;

    /// Sends a string and returns the response as a string
    async fn echo_string(&mut self, data: &str) -> Result<String> {
        let response = self.echo(data.as_bytes()).await?;
        String::from_utf8(response).map_err(EchoError::Utf8)
    }
}
