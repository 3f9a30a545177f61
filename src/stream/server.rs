use super::{Flow, StreamConfig, StreamProtocol};
use crate::common::EchoServerTrait;
use crate::{EchoError, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::{signal, time::timeout};
use tracing::{Instrument, debug, error, info, warn};

/// Generic stream-based echo server that works with any stream protocol
///
/// Every accepted connection runs in its own task: the protocol handshake,
/// then a strictly sequential receive/respond loop until the peer closes,
/// the transport fails or the protocol asks to close.
///
/// # Examples
///
/// ```no_run
/// use echoharness::common::EchoServerTrait;
/// use echoharness::http::{HttpConfig, HttpEchoServer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = HttpEchoServer::from_config(HttpConfig::default())?;
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct StreamEchoServer<P: StreamProtocol> {
    config: StreamConfig,
    protocol: Arc<P>,
    shutdown_signal: Arc<tokio::sync::broadcast::Sender<()>>,
}

impl<P: StreamProtocol> StreamEchoServer<P> {
    /// Creates a new stream-based echo server with the given configuration
    pub fn new(config: StreamConfig, protocol: P) -> Self {
        let (shutdown_signal, _) = tokio::sync::broadcast::channel(1);
        Self {
            config,
            protocol: Arc::new(protocol),
            shutdown_signal: Arc::new(shutdown_signal),
        }
    }

    /// Returns the server configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Runs the accept loop on an already bound listener
    ///
    /// Returns once Ctrl-C or the internal shutdown signal is received.
    /// Connections already in flight keep running in their own tasks.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "Echo server listening");

        let connection_count = Arc::new(AtomicUsize::new(0));
        let mut shutdown_rx = self.shutdown_signal.subscribe();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => self.spawn_connection(stream, addr, &connection_count),
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping server");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping server");
                    break;
                }
            }
        }

        info!(address = %local_addr, "Echo server stopped");
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr, connection_count: &Arc<AtomicUsize>) {
        let current_count = connection_count.load(Ordering::SeqCst);
        if let Some(limit) = self.config.max_connections {
            if current_count >= limit {
                warn!(%addr, current = current_count, limit, "Connection rejected: limit reached");
                return;
            }
        }

        let new_count = connection_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(%addr, current = new_count, "Accepted connection");

        let protocol = Arc::clone(&self.protocol);
        let config = self.config.clone();
        let connection_count = Arc::clone(connection_count);
        let span = tracing::info_span!("connection", %addr, current = new_count);

        tokio::spawn(async move {
            let result = Self::handle_connection(protocol, stream, addr, config)
                .instrument(span)
                .await;
            if let Err(e) = result {
                error!(%addr, error = %e, "Error handling connection");
            }
            let final_count = connection_count.fetch_sub(1, Ordering::SeqCst) - 1;
            info!(%addr, current = final_count, "Connection closed");
        });
    }

    /// Handles a single connection from handshake to close
    async fn handle_connection(
        protocol: Arc<P>,
        stream: TcpStream,
        addr: SocketAddr,
        config: StreamConfig,
    ) -> Result<()> {
        let mut stream = protocol
            .handshake(stream, &config)
            .await
            .map_err(Into::<EchoError>::into)?;
        debug!(%addr, "Handshake complete");

        loop {
            let received = match config.read_timeout {
                Some(limit) => match timeout(limit, protocol.receive(&mut stream)).await {
                    Ok(received) => received,
                    Err(_) => {
                        warn!(%addr, "Read timeout");
                        break;
                    }
                },
                None => protocol.receive(&mut stream).await,
            };

            let inbound = match received.map_err(Into::<EchoError>::into)? {
                Some(inbound) => inbound,
                None => {
                    info!(%addr, "Client closed connection");
                    break;
                }
            };

            match timeout(config.write_timeout, protocol.respond(&mut stream, addr, inbound)).await {
                Ok(Ok(Flow::Continue)) => {}
                Ok(Ok(Flow::Close)) => {
                    debug!(%addr, "Protocol closed connection");
                    break;
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    warn!(%addr, "Write timeout");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<P: StreamProtocol> EchoServerTrait for StreamEchoServer<P> {
    /// Binds `bind_addr` and runs the accept loop
    async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await.map_err(|e| {
            EchoError::Config(format!("Failed to bind {}: {e}", self.config.bind_addr))
        })?;
        self.serve(listener).await
    }

    /// Returns a shutdown signal sender that can be used to gracefully shutdown the server
    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }
}
