//! Stream-based echo server functionality
//!
//! This module provides the generic connection-oriented echo server that
//! drives any protocol implementing [`StreamProtocol`] (HTTP, WebSocket).

pub mod config;
pub mod protocol;
pub mod server;

#[cfg(test)]
mod tests;

pub use config::StreamConfig;
pub use protocol::{Flow, StreamProtocol};
pub use server::StreamEchoServer;
