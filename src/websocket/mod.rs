//! WebSocket echo server implementation
//!
//! Every data frame a client sends is logged and answered with one fixed
//! acknowledgment frame, in arrival order.

pub mod client;
pub mod config;
pub mod protocol;
pub mod server;

#[cfg(test)]
mod tests;

pub use client::WebSocketEchoClient;
pub use config::WebSocketConfig;
pub use protocol::{DEFAULT_ACK, WebSocketInbound, WebSocketProtocol, WebSocketProtocolError};
pub use server::WebSocketEchoServer;
