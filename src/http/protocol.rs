use super::request::{EchoRequest, RequestHead};
use super::response::{Connection, EchoResponse, encode_response, plain_response};
use crate::security::{SizeError, SizeValidator};
use crate::stream::{Flow, StreamConfig, StreamProtocol};
use ::http::{HeaderValue, Method, Response, StatusCode, Version, header};
use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Path answered by the echo route unless configured otherwise
pub const DEFAULT_ROUTE: &str = "/api/Tags/tag-crime";

/// Methods answered with a JSON echo
pub const ECHO_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// `Allow` header value for the echo route; HEAD and OPTIONS are implicit
const ALLOW: &str = "DELETE, GET, HEAD, OPTIONS, PATCH, POST, PUT";

const CONTINUE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

#[derive(Debug, thiserror::Error)]
pub enum HttpProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP parsing error: {0}")]
    HttpParse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Request head too large: {0}")]
    HeadTooLarge(SizeError),
    #[error("{0}")]
    BodyTooLarge(#[from] SizeError),
    #[error("Incomplete request")]
    IncompleteRequest,
}

impl HttpProtocolError {
    /// Status sent back when this error rejects a request
    pub fn status(&self) -> StatusCode {
        match self {
            HttpProtocolError::HeadTooLarge(_) => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            HttpProtocolError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            HttpProtocolError::Io(_) | HttpProtocolError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// HTTP stream wrapper that handles HTTP/1.x request framing
pub struct HttpStream {
    inner: TcpStream,
    buffer: BytesMut,
    limits: SizeValidator,
}

impl HttpStream {
    pub fn new(stream: TcpStream, limits: SizeValidator) -> Self {
        Self {
            inner: stream,
            buffer: BytesMut::with_capacity(4096),
            limits,
        }
    }

    async fn fill(&mut self) -> Result<usize, HttpProtocolError> {
        self.buffer.reserve(4096);
        Ok(self.inner.read_buf(&mut self.buffer).await?)
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), HttpProtocolError> {
        self.inner.write_all(data).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Reads the next complete request
    ///
    /// Returns `Ok(None)` when the peer closed the connection between
    /// requests. Bytes past the end of the request stay buffered for the
    /// next call.
    pub async fn read_request(&mut self) -> Result<Option<EchoRequest>, HttpProtocolError> {
        let (head, head_len) = loop {
            if let Some(parsed) = RequestHead::parse(&self.buffer)? {
                break parsed;
            }
            self.limits
                .validate_size(self.buffer.len())
                .map_err(HttpProtocolError::HeadTooLarge)?;
            if self.fill().await? == 0 {
                if self.buffer.iter().all(u8::is_ascii_whitespace) {
                    return Ok(None);
                }
                return Err(HttpProtocolError::IncompleteRequest);
            }
        };
        self.limits
            .validate_size(head_len)
            .map_err(HttpProtocolError::HeadTooLarge)?;

        let framing = head.framing()?;
        if let super::request::BodyFraming::Length(len) = framing {
            self.limits.validate_growth(head_len, len)?;
        }

        let mut continue_sent = false;
        loop {
            if let Some((body, body_len)) = framing.decode(&self.buffer[head_len..])? {
                let _ = self.buffer.split_to(head_len + body_len);
                return Ok(Some(head.into_request(body)));
            }
            self.limits.validate_size(self.buffer.len())?;

            if !continue_sent && framing.has_body() && head.expects_continue() {
                self.write_all(CONTINUE).await?;
                continue_sent = true;
            }
            if self.fill().await? == 0 {
                return Err(HttpProtocolError::IncompleteRequest);
            }
        }
    }
}

/// One unit handed from `receive` to `respond`
#[derive(Debug)]
pub enum HttpInbound {
    Request(EchoRequest),
    /// The request could not be read; answered with `status` and closed
    Rejected { status: StatusCode, reason: String },
}

/// HTTP protocol implementation for the echo server
///
/// Answers GET, POST, PUT, PATCH and DELETE on one route with a JSON
/// description of the request. HEAD gets the GET headers without a body,
/// OPTIONS lists the allowed methods, other methods get 405 and any other
/// path 404.
#[derive(Debug, Clone)]
pub struct HttpProtocol {
    route: String,
    server_name: Option<HeaderValue>,
}

impl HttpProtocol {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            server_name: None,
        }
    }

    /// Adds a `Server` header to every response
    pub fn with_server_name(mut self, value: HeaderValue) -> Self {
        self.server_name = Some(value);
        self
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Builds the response for a parsed request
    pub fn handle(&self, request: &EchoRequest) -> Result<Response<Vec<u8>>, HttpProtocolError> {
        let response = if request.path() != self.route.as_str() {
            plain_response(StatusCode::NOT_FOUND, "Not Found")
        } else if ECHO_METHODS.contains(&request.method) || request.method == Method::HEAD {
            let body = EchoResponse::from_request(request).to_json()?;
            let mut response = Response::new(body);
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        } else if request.method == Method::OPTIONS {
            let mut response = Response::new(Vec::new());
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(ALLOW));
            response
        } else {
            let mut response = plain_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(ALLOW));
            response
        };

        Ok(self.finish(response))
    }

    fn finish(&self, mut response: Response<Vec<u8>>) -> Response<Vec<u8>> {
        if let Some(name) = &self.server_name {
            response.headers_mut().insert(header::SERVER, name.clone());
        }
        response
    }
}

impl StreamProtocol for HttpProtocol {
    type Error = HttpProtocolError;
    type Stream = HttpStream;
    type Inbound = HttpInbound;

    async fn handshake(
        &self,
        stream: TcpStream,
        config: &StreamConfig,
    ) -> Result<HttpStream, HttpProtocolError> {
        Ok(HttpStream::new(
            stream,
            SizeValidator::new(config.max_request_size),
        ))
    }

    async fn receive(
        &self,
        stream: &mut HttpStream,
    ) -> Result<Option<HttpInbound>, HttpProtocolError> {
        match stream.read_request().await {
            Ok(request) => Ok(request.map(HttpInbound::Request)),
            Err(e @ (HttpProtocolError::Io(_) | HttpProtocolError::IncompleteRequest)) => Err(e),
            Err(e) => Ok(Some(HttpInbound::Rejected {
                status: e.status(),
                reason: e.to_string(),
            })),
        }
    }

    async fn respond(
        &self,
        stream: &mut HttpStream,
        addr: SocketAddr,
        inbound: HttpInbound,
    ) -> Result<Flow, HttpProtocolError> {
        match inbound {
            HttpInbound::Request(request) => {
                let response = self.handle(&request)?;
                let keep_alive = request.keep_alive();
                let connection = match (keep_alive, request.version) {
                    (false, _) => Connection::Close,
                    (true, Version::HTTP_10) => Connection::KeepAlive,
                    (true, _) => Connection::Default,
                };

                info!(
                    %addr,
                    method = %request.method,
                    path = %request.path(),
                    status = response.status().as_u16(),
                    body_size = request.body.len(),
                    "Echoed request"
                );

                let wire = encode_response(&response, request.method == Method::HEAD, connection);
                stream.write_all(&wire).await?;

                if keep_alive {
                    Ok(Flow::Continue)
                } else {
                    debug!(%addr, "Client did not ask for keep-alive");
                    Ok(Flow::Close)
                }
            }
            HttpInbound::Rejected { status, reason } => {
                warn!(%addr, status = status.as_u16(), %reason, "Rejected request");
                let response = self.finish(plain_response(status, &reason));
                stream
                    .write_all(&encode_response(&response, false, Connection::Close))
                    .await?;
                Ok(Flow::Close)
            }
        }
    }
}
