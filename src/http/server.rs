use super::config::HttpConfig;
use super::protocol::HttpProtocol;
use crate::stream::StreamEchoServer;
use crate::{EchoError, Result};
use ::http::HeaderValue;

/// HTTP echo server
///
/// This is a type alias for `StreamEchoServer<HttpProtocol>`.
///
/// # Examples
///
/// ```no_run
/// use echoharness::common::EchoServerTrait;
/// use echoharness::http::{HttpConfig, HttpEchoServer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = HttpConfig {
///         bind_addr: "127.0.0.1:8080".parse()?,
///         ..HttpConfig::default()
///     };
///     let server = HttpEchoServer::from_config(config)?;
///     let shutdown_signal = server.shutdown_signal();
///
///     let server_handle = tokio::spawn(async move { server.run().await });
///
///     let _ = shutdown_signal.send(());
///     server_handle.await??;
///     Ok(())
/// }
/// ```
pub type HttpEchoServer = StreamEchoServer<HttpProtocol>;

impl StreamEchoServer<HttpProtocol> {
    /// Builds the server and its protocol from one `HttpConfig`
    pub fn from_config(config: HttpConfig) -> Result<Self> {
        if !config.route.starts_with('/') {
            return Err(EchoError::Config(format!(
                "Route must start with '/': {}",
                config.route
            )));
        }

        let mut protocol = HttpProtocol::new(config.route.clone());
        if let Some(name) = &config.server_name {
            let value = HeaderValue::from_str(name)
                .map_err(|e| EchoError::Config(format!("Invalid server name {name:?}: {e}")))?;
            protocol = protocol.with_server_name(value);
        }

        Ok(Self::new(config.into(), protocol))
    }
}
