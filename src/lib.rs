use crate::http::protocol::HttpProtocolError;
use crate::websocket::protocol::WebSocketProtocolError;
use thiserror::Error;

/// Error types for the echoharness library
#[derive(Error, Debug)]
pub enum EchoError {
    /// TCP-related errors (bind, accept, connect, read, write)
    #[error("TCP error: {0}")]
    Tcp(#[from] std::io::Error),

    /// HTTP framing or protocol errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// WebSocket handshake and transport errors
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON encoding/decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// UTF-8 encoding errors
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<HttpProtocolError> for EchoError {
    fn from(err: HttpProtocolError) -> Self {
        match err {
            HttpProtocolError::Io(e) => EchoError::Tcp(e),
            HttpProtocolError::Json(e) => EchoError::Json(e),
            other => EchoError::Http(other.to_string()),
        }
    }
}

impl From<WebSocketProtocolError> for EchoError {
    fn from(err: WebSocketProtocolError) -> Self {
        match err {
            WebSocketProtocolError::Transport(e) => EchoError::WebSocket(e),
        }
    }
}

/// Result type for the echoharness library
pub type Result<T> = std::result::Result<T, EchoError>;

pub mod common;
pub mod http;
pub mod security;
pub mod stream;
pub mod websocket;

// Re-export main types for convenience
pub use common::{EchoClient, EchoServerTrait};
pub use crate::http::{EchoRequest, EchoResponse, HttpConfig, HttpEchoClient, HttpEchoServer, HttpProtocol};
pub use stream::{Flow, StreamConfig, StreamEchoServer, StreamProtocol};
pub use websocket::{WebSocketConfig, WebSocketEchoClient, WebSocketEchoServer, WebSocketProtocol};
