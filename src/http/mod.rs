//! HTTP echo server implementation
//!
//! This module answers one fixed route with a JSON document describing the
//! request it received: method, path, headers and body.

pub mod client;
pub mod config;
pub mod protocol;
pub mod request;
pub mod response;
pub mod server;


pub use client::{HttpEchoClient, HttpReply};
pub use config::HttpConfig;
pub use protocol::{DEFAULT_ROUTE, ECHO_METHODS, HttpInbound, HttpProtocol, HttpProtocolError, HttpStream};
pub use request::EchoRequest;
pub use response::{EchoHeaders, EchoResponse};
pub use server::HttpEchoServer;
