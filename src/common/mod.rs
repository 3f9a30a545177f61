//! Common traits and types used across the echoharness library
//!
//! This module contains the core traits that define the interface
//! for echo servers and clients.

pub mod client;
pub mod test_utils;
pub mod traits;

pub use client::{ClientConfig, ClientConfigBuilder};
pub use test_utils::{TestServer, spawn_http_test_server, spawn_websocket_test_server};
pub use traits::{EchoClient, EchoServerTrait};
