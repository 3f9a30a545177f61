use super::protocol::HttpProtocolError;
use crate::security::SizeError;
use ::http::{Method, Version};
use bytes::Bytes;
use std::borrow::Cow;

/// Maximum number of header fields accepted in one request head
pub const MAX_HEADERS: usize = 100;

/// One HTTP request as received on the wire
///
/// Header names keep the spelling the client used; lookups through
/// [`EchoRequest::header`] are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoRequest {
    pub method: Method,
    /// Request target exactly as sent, query string included
    pub target: String,
    pub version: Version,
    /// Header fields in arrival order
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl EchoRequest {
    /// Path component of the target, without the query string and
    /// percent-decoded
    pub fn path(&self) -> Cow<'_, str> {
        let raw = match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        };
        percent_decode(raw)
    }

    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the connection stays open after this request
    pub fn keep_alive(&self) -> bool {
        let connection = self.header("connection").map(str::to_ascii_lowercase);
        let has_token = |token: &str| {
            connection
                .as_deref()
                .is_some_and(|value| value.split(',').any(|t| t.trim() == token))
        };

        if self.version == Version::HTTP_10 {
            has_token("keep-alive")
        } else {
            !has_token("close")
        }
    }

    /// Parses a complete request (head and body) from `buf`
    ///
    /// Returns `Ok(None)` when more bytes are needed, otherwise the request
    /// and the number of bytes it occupied.
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>, HttpProtocolError> {
        let Some((head, head_len)) = RequestHead::parse(buf)? else {
            return Ok(None);
        };
        let Some((body, body_len)) = head.framing()?.decode(&buf[head_len..])? else {
            return Ok(None);
        };
        Ok(Some((head.into_request(body), head_len + body_len)))
    }
}

/// Decodes `%XX` escapes; malformed escapes are kept as they are
///
/// Decoded bytes that are not UTF-8 are replaced.
fn percent_decode(raw: &str) -> Cow<'_, str> {
    if !raw.contains('%') {
        return Cow::Borrowed(raw);
    }

    let mut bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    while let [first, rest @ ..] = bytes {
        bytes = rest;
        if *first == b'%' {
            if let Some(byte) = hex_pair(&mut bytes) {
                decoded.push(byte);
                continue;
            }
        }
        decoded.push(*first);
    }
    Cow::Owned(String::from_utf8_lossy(&decoded).into_owned())
}

fn hex_pair(bytes: &mut &[u8]) -> Option<u8> {
    let [high, low, rest @ ..] = bytes else {
        return None;
    };
    let high = char::from(*high).to_digit(16)?;
    let low = char::from(*low).to_digit(16)?;
    *bytes = rest;
    u8::try_from(high * 16 + low).ok()
}

/// Request line and header fields, before the body has arrived
#[derive(Debug, Clone)]
pub(crate) struct RequestHead {
    pub method: Method,
    pub target: String,
    pub version: Version,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>, HttpProtocolError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);

        let head_len = match req.parse(buf) {
            Ok(httparse::Status::Complete(len)) => len,
            Ok(httparse::Status::Partial) => return Ok(None),
            Err(httparse::Error::TooManyHeaders) => {
                return Err(HttpProtocolError::HeadTooLarge(SizeError::TooManyFields {
                    max: MAX_HEADERS,
                }));
            }
            Err(e) => {
                return Err(HttpProtocolError::HttpParse(format!(
                    "Failed to parse request head: {e}"
                )));
            }
        };

        // httparse guarantees these are set on a complete parse
        let method = req.method.unwrap_or_default();
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| HttpProtocolError::InvalidRequest(format!("Invalid method: {e}")))?;
        let version = match req.version {
            Some(0) => Version::HTTP_10,
            _ => Version::HTTP_11,
        };
        let target = req.path.unwrap_or("/").to_string();
        let headers = req
            .headers
            .iter()
            .map(|h| {
                (
                    h.name.to_string(),
                    String::from_utf8_lossy(h.value).into_owned(),
                )
            })
            .collect();

        Ok(Some((
            Self {
                method,
                target,
                version,
                headers,
            },
            head_len,
        )))
    }

    fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the client waits for `100 Continue` before sending the body
    pub fn expects_continue(&self) -> bool {
        self.version == Version::HTTP_11
            && self
                .values("expect")
                .any(|value| value.trim().eq_ignore_ascii_case("100-continue"))
    }

    /// Determines how the body is delimited
    pub fn framing(&self) -> Result<BodyFraming, HttpProtocolError> {
        let codings: Vec<String> = self
            .values("transfer-encoding")
            .flat_map(|value| value.split(','))
            .map(|coding| coding.trim().to_ascii_lowercase())
            .filter(|coding| !coding.is_empty())
            .collect();

        if let Some(last) = codings.last() {
            return if last == "chunked" {
                Ok(BodyFraming::Chunked)
            } else {
                Err(HttpProtocolError::InvalidRequest(format!(
                    "Unsupported transfer coding: {last}"
                )))
            };
        }

        let mut length = None;
        for value in self.values("content-length") {
            let parsed = value.trim().parse::<usize>().map_err(|_| {
                HttpProtocolError::InvalidRequest(format!("Invalid Content-Length: {value}"))
            })?;
            match length {
                Some(previous) if previous != parsed => {
                    return Err(HttpProtocolError::InvalidRequest(
                        "Conflicting Content-Length headers".to_string(),
                    ));
                }
                _ => length = Some(parsed),
            }
        }

        Ok(BodyFraming::Length(length.unwrap_or(0)))
    }

    pub fn into_request(self, body: Bytes) -> EchoRequest {
        EchoRequest {
            method: self.method,
            target: self.target,
            version: self.version,
            headers: self.headers,
            body,
        }
    }
}

/// How a request body is delimited on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyFraming {
    Length(usize),
    Chunked,
}

impl BodyFraming {
    pub fn has_body(&self) -> bool {
        !matches!(self, BodyFraming::Length(0))
    }

    /// Decodes a body from the bytes following the head
    ///
    /// Returns the decoded body and the number of wire bytes consumed, or
    /// `None` when the body is not complete yet.
    pub fn decode(&self, buf: &[u8]) -> Result<Option<(Bytes, usize)>, HttpProtocolError> {
        match *self {
            BodyFraming::Length(len) => {
                if buf.len() < len {
                    return Ok(None);
                }
                Ok(Some((Bytes::copy_from_slice(&buf[..len]), len)))
            }
            BodyFraming::Chunked => decode_chunked(buf),
        }
    }
}

fn decode_chunked(buf: &[u8]) -> Result<Option<(Bytes, usize)>, HttpProtocolError> {
    let mut body = Vec::new();
    let mut pos = 0;

    loop {
        let (consumed, size) = match httparse::parse_chunk_size(&buf[pos..]) {
            Ok(httparse::Status::Complete(parsed)) => parsed,
            Ok(httparse::Status::Partial) => return Ok(None),
            Err(_) => {
                return Err(HttpProtocolError::HttpParse(
                    "Invalid chunk size".to_string(),
                ));
            }
        };
        pos += consumed;

        if size == 0 {
            // Optional trailer fields, then an empty line
            let rest = &buf[pos..];
            if rest.starts_with(b"\r\n") {
                return Ok(Some((Bytes::from(body), pos + 2)));
            }
            return Ok(rest
                .windows(4)
                .position(|window| window == b"\r\n\r\n")
                .map(|end| (Bytes::from(body), pos + end + 4)));
        }

        let size = usize::try_from(size)
            .map_err(|_| HttpProtocolError::InvalidRequest("Chunk too large".to_string()))?;
        let chunk_end = pos.saturating_add(size);
        if buf.len() < chunk_end.saturating_add(2) {
            return Ok(None);
        }
        if &buf[chunk_end..chunk_end + 2] != b"\r\n" {
            return Err(HttpProtocolError::HttpParse(
                "Missing CRLF after chunk data".to_string(),
            ));
        }
        body.extend_from_slice(&buf[pos..chunk_end]);
        pos = chunk_end + 2;
    }
}
