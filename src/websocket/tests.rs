use super::protocol::{DEFAULT_ACK, WebSocketInbound, WebSocketProtocol};
use crate::stream::{Flow, StreamConfig, StreamProtocol};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

async fn accept_one(protocol: WebSocketProtocol) -> (SocketAddr, tokio::task::JoinHandle<Vec<WebSocketInbound>>) {
    let config = StreamConfig::default();
    let listener = TcpListener::bind(config.bind_addr).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (tcp, peer) = listener.accept().await.unwrap();
        let mut stream = protocol.handshake(tcp, &config).await.unwrap();
        let mut seen = Vec::new();
        while let Some(inbound) = protocol.receive(&mut stream).await.unwrap() {
            seen.push(inbound.clone());
            assert_eq!(protocol.respond(&mut stream, peer, inbound).await.unwrap(), Flow::Continue);
        }
        seen
    });

    (addr, handle)
}

#[test]
fn test_default_ack() {
    assert_eq!(WebSocketProtocol::default().ack(), DEFAULT_ACK);
    assert_eq!(WebSocketProtocol::new("ok").ack(), "ok");
}

#[tokio::test]
async fn test_text_frames_are_acknowledged_in_order() {
    let (addr, server) = accept_one(WebSocketProtocol::default()).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/")).await.unwrap();

    for text in ["ping", "ping2", "ping3"] {
        ws.send(Message::text(text.to_owned())).await.unwrap();
        let reply = ws.next().await.unwrap().unwrap();
        assert_eq!(reply, Message::text("ack".to_owned()));
    }
    ws.close(None).await.unwrap();
    while ws.next().await.is_some() {}

    let seen = server.await.unwrap();
    assert_eq!(
        seen,
        vec![
            WebSocketInbound::Text("ping".to_string()),
            WebSocketInbound::Text("ping2".to_string()),
            WebSocketInbound::Text("ping3".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_custom_ack_text() {
    let (addr, server) = accept_one(WebSocketProtocol::new("received")).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/")).await.unwrap();

    ws.send(Message::text("hello".to_owned())).await.unwrap();
    let reply = ws.next().await.unwrap().unwrap();
    assert_eq!(reply.to_text().unwrap(), "received");

    ws.close(None).await.unwrap();
    while ws.next().await.is_some() {}
    server.await.unwrap();
}

#[tokio::test]
async fn test_binary_frames_are_acknowledged() {
    let (addr, server) = accept_one(WebSocketProtocol::default()).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/")).await.unwrap();

    ws.send(Message::binary(vec![0u8, 159, 146, 150])).await.unwrap();
    let reply = ws.next().await.unwrap().unwrap();
    assert_eq!(reply.to_text().unwrap(), "ack");

    ws.close(None).await.unwrap();
    while ws.next().await.is_some() {}

    let seen = server.await.unwrap();
    assert!(matches!(&seen[..], [WebSocketInbound::Binary(data)] if data.len() == 4));
}

#[tokio::test]
async fn test_ping_is_not_acknowledged() {
    let (addr, server) = accept_one(WebSocketProtocol::default()).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/")).await.unwrap();

    ws.send(Message::Ping(vec![1u8, 2, 3].into())).await.unwrap();
    ws.send(Message::text("after ping".to_owned())).await.unwrap();

    // The pong comes first, then exactly one ack for the text frame
    let mut acks = 0;
    let mut pongs = 0;
    while acks == 0 {
        match ws.next().await.unwrap().unwrap() {
            Message::Pong(_) => pongs += 1,
            Message::Text(text) => {
                assert_eq!(text.as_str(), "ack");
                acks += 1;
            }
            other => panic!("Unexpected message {other:?}"),
        }
    }
    assert_eq!(pongs, 1);

    ws.close(None).await.unwrap();
    while ws.next().await.is_some() {}

    let seen = server.await.unwrap();
    assert_eq!(seen, vec![WebSocketInbound::Text("after ping".to_string())]);
}

#[tokio::test]
async fn test_client_close_ends_receive_loop() {
    let (addr, server) = accept_one(WebSocketProtocol::default()).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/")).await.unwrap();

    ws.close(None).await.unwrap();
    // The server answers the close handshake
    match ws.next().await {
        Some(Ok(Message::Close(_))) | None => {}
        other => panic!("Expected close reply, got {other:?}"),
    }

    let seen = server.await.unwrap();
    assert!(seen.is_empty());
}

#[tokio::test]
async fn test_abrupt_disconnect_is_clean_end() {
    let (addr, server) = accept_one(WebSocketProtocol::default()).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/")).await.unwrap();

    ws.send(Message::text("bye".to_owned())).await.unwrap();
    let _ = ws.next().await.unwrap().unwrap();
    drop(ws);

    let seen = server.await.unwrap();
    assert_eq!(seen.len(), 1);
}

#[derive(Clone, Default)]
struct LogCapture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_received_text_is_logged_as_named_field() {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (addr, server) = accept_one(WebSocketProtocol::default()).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
    ws.send(Message::text("frame-payload".to_owned())).await.unwrap();
    ws.next().await.unwrap().unwrap();
    ws.close(None).await.unwrap();
    while ws.next().await.is_some() {}
    server.await.unwrap();

    let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    assert!(logs.contains("text=frame-payload"), "logs: {logs}");
}
