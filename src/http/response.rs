use super::request::EchoRequest;
use ::http::{Response, StatusCode, header};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// JSON description of a request, as returned by the echo route
///
/// Always serializes all four keys, whatever their content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub method: String,
    pub path: String,
    pub headers: EchoHeaders,
    pub body: String,
}

impl EchoResponse {
    pub fn from_request(request: &EchoRequest) -> Self {
        Self {
            method: request.method.as_str().to_string(),
            path: request.path().to_string(),
            headers: EchoHeaders::fold(&request.headers),
            body: String::from_utf8_lossy(&request.body).into_owned(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Header object of an [`EchoResponse`]
///
/// Serialized as a JSON object in arrival order. Repeated names collapse
/// into the first spelling seen, values joined with `", "`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoHeaders(Vec<(String, String)>);

impl EchoHeaders {
    pub fn fold(fields: &[(String, String)]) -> Self {
        let mut folded: Vec<(String, String)> = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            match folded
                .iter_mut()
                .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            {
                Some((_, joined)) => {
                    joined.push_str(", ");
                    joined.push_str(value);
                }
                None => folded.push((name.clone(), value.clone())),
            }
        }
        Self(folded)
    }

    /// Value for `name`, matched case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for EchoHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EchoHeaders {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = EchoHeaders;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of header names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    fields.push((name, value));
                }
                Ok(EchoHeaders(fields))
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

/// Builds a plain-text response for error statuses
pub fn plain_response(status: StatusCode, reason: &str) -> Response<Vec<u8>> {
    let mut response = Response::new(format!("{reason}\n").into_bytes());
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Serializes a response as HTTP/1.1 wire bytes
///
/// `Content-Length` is always derived from the body, also when `head_only`
/// suppresses the body itself.
pub fn encode_response(response: &Response<Vec<u8>>, head_only: bool, connection: Connection) -> Vec<u8> {
    let status = response.status();
    let body = response.body();
    let mut out = Vec::with_capacity(256 + body.len());

    out.extend_from_slice(
        format!(
            "HTTP/1.1 {} {}\r\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )
        .as_bytes(),
    );
    for (name, value) in response.headers() {
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    match connection {
        Connection::Close => out.extend_from_slice(b"Connection: close\r\n"),
        Connection::KeepAlive => out.extend_from_slice(b"Connection: keep-alive\r\n"),
        Connection::Default => {}
    }
    out.extend_from_slice(b"\r\n");
    if !head_only {
        out.extend_from_slice(body);
    }
    out
}

/// `Connection` header emitted with a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    /// Omit the header, the version default applies
    Default,
    KeepAlive,
    Close,
}
