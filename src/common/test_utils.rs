use crate::common::EchoServerTrait;
use crate::http::{HttpConfig, HttpEchoServer};
use crate::websocket::{WebSocketConfig, WebSocketEchoServer};
use crate::{EchoError, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Handle to a server spawned for tests
pub struct TestServer {
    /// Address the server accepts connections on
    pub addr: SocketAddr,
    /// Task running the accept loop
    pub handle: JoinHandle<Result<()>>,
    shutdown: broadcast::Sender<()>,
}

impl TestServer {
    /// Stops the accept loop and waits for it to return
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.handle
            .await
            .map_err(|e| EchoError::Config(format!("Server task failed: {e}")))?
    }
}

async fn bind_ephemeral() -> Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| EchoError::Config(format!("Failed to bind listener: {e}")))?;
    let addr = listener
        .local_addr()
        .map_err(|e| EchoError::Config(format!("Failed to get local address: {e}")))?;
    Ok((listener, addr))
}

/// Spawns an HTTP echo server on an ephemeral loopback port
///
/// The listener is bound before this returns, so clients can connect
/// immediately.
pub async fn spawn_http_test_server(mut config: HttpConfig) -> Result<TestServer> {
    let (listener, addr) = bind_ephemeral().await?;
    config.bind_addr = addr;

    let server = HttpEchoServer::from_config(config)?;
    let shutdown = server.shutdown_signal();
    let handle = tokio::spawn(async move { server.serve(listener).await });

    Ok(TestServer { addr, handle, shutdown })
}

/// Spawns a WebSocket echo server on an ephemeral loopback port
pub async fn spawn_websocket_test_server(mut config: WebSocketConfig) -> Result<TestServer> {
    let (listener, addr) = bind_ephemeral().await?;
    config.bind_addr = addr;

    let server = WebSocketEchoServer::from_config(config);
    let shutdown = server.shutdown_signal();
    let handle = tokio::spawn(async move { server.serve(listener).await });

    Ok(TestServer { addr, handle, shutdown })
}
