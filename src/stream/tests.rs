use super::{Flow, StreamConfig, StreamEchoServer, StreamProtocol};
use crate::EchoError;
use crate::common::EchoServerTrait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Line-based protocol used to exercise the generic server loop
struct LineProtocol;

impl StreamProtocol for LineProtocol {
    type Error = EchoError;
    type Stream = BufReader<TcpStream>;
    type Inbound = String;

    async fn handshake(&self, stream: TcpStream, _config: &StreamConfig) -> Result<Self::Stream, EchoError> {
        Ok(BufReader::new(stream))
    }

    async fn receive(&self, stream: &mut Self::Stream) -> Result<Option<String>, EchoError> {
        let mut line = String::new();
        if stream.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end().to_string()))
    }

    async fn respond(&self, stream: &mut Self::Stream, _addr: SocketAddr, line: String) -> Result<Flow, EchoError> {
        stream.get_mut().write_all(format!("{line}\n").as_bytes()).await?;
        if line == "quit" {
            Ok(Flow::Close)
        } else {
            Ok(Flow::Continue)
        }
    }
}

async fn spawn_line_server(
    config: StreamConfig,
) -> (SocketAddr, tokio::sync::broadcast::Sender<()>, tokio::task::JoinHandle<crate::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = StreamEchoServer::new(config, LineProtocol);
    let shutdown = server.shutdown_signal();
    let handle = tokio::spawn(async move { server.serve(listener).await });
    (addr, shutdown, handle)
}

async fn exchange(stream: &mut BufReader<TcpStream>, line: &str) -> String {
    stream.get_mut().write_all(format!("{line}\n").as_bytes()).await.unwrap();
    let mut reply = String::new();
    stream.read_line(&mut reply).await.unwrap();
    reply.trim_end().to_string()
}

#[test]
fn test_config_default() {
    let config = StreamConfig::default();
    assert!(config.bind_addr.ip().is_loopback());
    assert_eq!(config.max_connections, None);
    assert_eq!(config.read_timeout, None);
    assert_eq!(config.write_timeout, Duration::from_secs(30));
}

#[tokio::test]
async fn test_server_new_has_no_subscribers() {
    let server = StreamEchoServer::new(StreamConfig::default(), LineProtocol);
    assert_eq!(server.shutdown_signal().receiver_count(), 0);
}

#[tokio::test]
async fn test_sequential_messages_on_one_connection() {
    let (addr, shutdown, handle) = spawn_line_server(StreamConfig::default()).await;

    let mut client = BufReader::new(TcpStream::connect(addr).await.unwrap());
    assert_eq!(exchange(&mut client, "one").await, "one");
    assert_eq!(exchange(&mut client, "two").await, "two");
    assert_eq!(exchange(&mut client, "three").await, "three");

    let _ = shutdown.send(());
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_flow_close_ends_connection() {
    let (addr, shutdown, handle) = spawn_line_server(StreamConfig::default()).await;

    let mut client = BufReader::new(TcpStream::connect(addr).await.unwrap());
    assert_eq!(exchange(&mut client, "quit").await, "quit");

    let mut rest = Vec::new();
    let n = client.read_to_end(&mut rest).await.unwrap();
    assert_eq!(n, 0);

    let _ = shutdown.send(());
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_connections_are_independent() {
    let (addr, shutdown, handle) = spawn_line_server(StreamConfig::default()).await;

    let mut first = BufReader::new(TcpStream::connect(addr).await.unwrap());
    let mut second = BufReader::new(TcpStream::connect(addr).await.unwrap());

    // An idle first connection does not hold up the second one
    assert_eq!(exchange(&mut second, "hello").await, "hello");
    drop(second);
    assert_eq!(exchange(&mut first, "still here").await, "still here");

    let _ = shutdown.send(());
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_connection_limit_rejects_extra_clients() {
    let config = StreamConfig {
        max_connections: Some(1),
        ..StreamConfig::default()
    };
    let (addr, shutdown, handle) = spawn_line_server(config).await;

    let mut first = BufReader::new(TcpStream::connect(addr).await.unwrap());
    assert_eq!(exchange(&mut first, "in").await, "in");

    let mut second = TcpStream::connect(addr).await.unwrap();
    let _ = second.write_all(b"rejected\n").await;
    let mut buf = [0u8; 16];
    let result = tokio::time::timeout(Duration::from_secs(5), second.read(&mut buf))
        .await
        .unwrap();
    assert!(matches!(result, Ok(0) | Err(_)));

    let _ = shutdown.send(());
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_read_timeout_closes_idle_connection() {
    let config = StreamConfig {
        read_timeout: Some(Duration::from_millis(100)),
        ..StreamConfig::default()
    };
    let (addr, shutdown, handle) = spawn_line_server(config).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    let mut buf = [0u8; 16];
    let result = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .unwrap();
    assert!(matches!(result, Ok(0) | Err(_)));

    let _ = shutdown.send(());
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_run_reports_bind_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = StreamConfig {
        bind_addr: listener.local_addr().unwrap(),
        ..StreamConfig::default()
    };

    let server = StreamEchoServer::new(config, LineProtocol);
    let err = server.run().await.unwrap_err();
    assert!(matches!(err, EchoError::Config(_)));
}
