use super::protocol::DEFAULT_ROUTE;
use super::response::EchoResponse;
use crate::common::{ClientConfig, EchoClient};
use crate::{EchoError, Result};
use ::http::{Method, StatusCode};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// A response as seen by [`HttpEchoClient`]
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    /// Header fields in arrival order
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpReply {
    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Decodes the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    fn closes_connection(&self) -> bool {
        self.header("connection")
            .is_some_and(|value| value.eq_ignore_ascii_case("close"))
    }
}

/// HTTP/1.1 client for the echo server
///
/// Keeps one connection alive across requests and reconnects when the
/// server closed it.
///
/// # Examples
///
/// ```no_run
/// use echoharness::http::HttpEchoClient;
/// use http::Method;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let addr = "127.0.0.1:8080".parse()?;
///     let mut client = HttpEchoClient::connect(addr).await?;
///
///     let record = client
///         .echo_record(Method::POST, &[("X-Test", "1")], b"hello")
///         .await?;
///     println!("Server saw {} {}", record.method, record.path);
///     Ok(())
/// }
/// ```
pub struct HttpEchoClient {
    addr: SocketAddr,
    route: String,
    config: ClientConfig,
    stream: Option<TcpStream>,
    buffer: BytesMut,
}

impl HttpEchoClient {
    /// Connect to a server with custom configuration
    pub async fn connect_with_config(addr: SocketAddr, config: ClientConfig) -> Result<Self> {
        let mut client = Self {
            addr,
            route: DEFAULT_ROUTE.to_string(),
            config,
            stream: None,
            buffer: BytesMut::with_capacity(4096),
        };
        client.ensure_connected().await?;
        Ok(client)
    }

    /// Connect with default configuration
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_config(addr, ClientConfig::default()).await
    }

    /// Targets a different echo route
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    async fn ensure_connected(&mut self) -> Result<&mut TcpStream> {
        if self.stream.is_none() {
            let stream = timeout(self.config.connect_timeout, TcpStream::connect(self.addr))
                .await
                .map_err(|_| EchoError::Timeout("Connection timeout".to_string()))??;
            self.buffer.clear();
            self.stream = Some(stream);
        }
        self.stream
            .as_mut()
            .ok_or_else(|| EchoError::Http("Not connected".to_string()))
    }

    /// Sends one request and waits for its response
    ///
    /// `Host` and `Content-Length` are added unless `headers` already
    /// carries them.
    pub async fn request(
        &mut self,
        method: Method,
        target: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<HttpReply> {
        let has = |name: &str| headers.iter().any(|(key, _)| key.eq_ignore_ascii_case(name));

        let mut wire = format!("{method} {target} HTTP/1.1\r\n");
        if !has("host") {
            wire.push_str(&format!("Host: {}\r\n", self.addr));
        }
        for (name, value) in headers {
            wire.push_str(&format!("{name}: {value}\r\n"));
        }
        let sends_body = !body.is_empty() || [Method::POST, Method::PUT, Method::PATCH].contains(&method);
        if sends_body && !has("content-length") && !has("transfer-encoding") {
            wire.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        wire.push_str("\r\n");

        let mut wire = wire.into_bytes();
        wire.extend_from_slice(body);

        let write_timeout = self.config.write_timeout;
        let stream = self.ensure_connected().await?;
        let written = timeout(write_timeout, stream.write_all(&wire))
            .await
            .map_err(|_| EchoError::Timeout("Write timeout".to_string()))
            .and_then(|result| result.map_err(EchoError::from));
        if let Err(e) = written {
            self.stream = None;
            return Err(e);
        }

        let reply = match self.read_reply(method == Method::HEAD).await {
            Ok(reply) => reply,
            Err(e) => {
                self.stream = None;
                return Err(e);
            }
        };
        if reply.closes_connection() {
            self.stream = None;
        }
        Ok(reply)
    }

    /// Sends a request to the echo route and decodes the JSON record
    pub async fn echo_record(
        &mut self,
        method: Method,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<EchoResponse> {
        let route = self.route.clone();
        let reply = self.request(method, &route, headers, body).await?;
        if reply.status != StatusCode::OK {
            return Err(EchoError::Http(format!("Unexpected status {}", reply.status)));
        }
        reply.json()
    }

    /// POSTs `value` as a JSON body to the echo route
    pub async fn post_json<T: Serialize>(&mut self, value: &T) -> Result<EchoResponse> {
        let body = serde_json::to_vec(value)?;
        self.echo_record(
            Method::POST,
            &[("Content-Type", "application/json")],
            &body,
        )
        .await
    }

    async fn read_reply(&mut self, head_only: bool) -> Result<HttpReply> {
        loop {
            if let Some((reply, used)) = parse_reply(&self.buffer, head_only)? {
                let _ = self.buffer.split_to(used);
                if reply.status.is_informational() {
                    continue;
                }
                return Ok(reply);
            }

            if self.buffer.len() > self.config.max_response_size {
                return Err(EchoError::Http(format!(
                    "Response too large: more than {} bytes",
                    self.config.max_response_size
                )));
            }

            let stream = self
                .stream
                .as_mut()
                .ok_or_else(|| EchoError::Http("Not connected".to_string()))?;
            self.buffer.reserve(4096);
            let n = timeout(self.config.read_timeout, stream.read_buf(&mut self.buffer))
                .await
                .map_err(|_| EchoError::Timeout("Read timeout".to_string()))??;
            if n == 0 {
                return Err(EchoError::Http(
                    "Connection closed before the response was complete".to_string(),
                ));
            }
        }
    }
}

pub(crate) fn parse_reply(buf: &[u8], head_only: bool) -> Result<Option<(HttpReply, usize)>> {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut res = httparse::Response::new(&mut headers);

    let head_len = match res.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(EchoError::Http(format!("Failed to parse response: {e}"))),
    };

    let status = StatusCode::from_u16(res.code.unwrap_or_default())
        .map_err(|e| EchoError::Http(format!("Invalid status code: {e}")))?;
    let headers: Vec<(String, String)> = res
        .headers
        .iter()
        .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
        .collect();

    let body_len = if head_only || status.is_informational() || status == StatusCode::NO_CONTENT {
        0
    } else {
        headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
            .ok_or_else(|| EchoError::Http("Response without Content-Length".to_string()))?
            .1
            .trim()
            .parse::<usize>()
            .map_err(|e| EchoError::Http(format!("Invalid Content-Length: {e}")))?
    };

    let end = head_len
        .checked_add(body_len)
        .ok_or_else(|| EchoError::Http(format!("Content-Length too large: {body_len}")))?;
    if buf.len() < end {
        return Ok(None);
    }

    Ok(Some((
        HttpReply {
            status,
            headers,
            body: Bytes::copy_from_slice(&buf[head_len..end]),
        },
        end,
    )))
}

#[async_trait]
impl EchoClient for HttpEchoClient {
    /// POSTs `data` to the echo route and returns the raw JSON body
    async fn echo(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let route = self.route.clone();
        let reply = self.request(Method::POST, &route, &[], data).await?;
        if !reply.status.is_success() {
            return Err(EchoError::Http(format!("Unexpected status {}", reply.status)));
        }
        Ok(reply.body.to_vec())
    }
}
