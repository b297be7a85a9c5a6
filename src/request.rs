//! ALB event -> `http::Request` decoding.

use std::{
    collections::HashMap,
    io::{self, Read},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::{buf::Reader, Buf, Bytes};
use http::{header::HOST, HeaderMap, HeaderName, HeaderValue, Method, Request, Version};

use crate::{
    error::Result,
    event::AlbRequestEvent,
    handler::InvocationContext,
    target::{build_target, QueryStrategy},
};

/// One-shot request body.
///
/// The event body is already fully in memory; this exposes it as a reader that can be consumed
/// once, plus the declared length.
pub struct RequestBody {
    reader: Reader<Bytes>,
    content_length: u64,
}

impl RequestBody {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            content_length: bytes.len() as u64,
            reader: bytes.reader(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Bytes::new())
    }

    /// Length of the decoded body as received, regardless of how much has been read.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.reader.get_ref().remaining()
    }

    /// Consume the unread remainder without copying.
    pub fn into_bytes(self) -> Bytes {
        self.reader.into_inner()
    }
}

impl Read for RequestBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBody")
            .field("content_length", &self.content_length)
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// Value of the inbound `Host` header, stored as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host(pub String);

/// Accessors for what the adapter attaches to a request besides headers.
pub trait RequestExt {
    fn host(&self) -> Option<&str>;
    fn invocation_context(&self) -> Option<&InvocationContext>;
}

impl<B> RequestExt for Request<B> {
    fn host(&self) -> Option<&str> {
        self.extensions().get::<Host>().map(|h| h.0.as_str())
    }

    fn invocation_context(&self) -> Option<&InvocationContext> {
        self.extensions().get::<InvocationContext>()
    }
}

/// Build the request handed to the handler.
///
/// Fails on a malformed base64 body, malformed percent-escapes, a target the URI parser rejects,
/// or a method that is not an HTTP token.
pub fn decode_event(
    event: AlbRequestEvent,
    strategy: QueryStrategy,
) -> Result<Request<RequestBody>> {
    let uri = build_target(&event.path, &event.query_string_parameters, strategy)?;
    let method = Method::from_bytes(event.http_method.as_bytes())?;

    let body = if event.is_base64_encoded {
        Bytes::from(decode_base64_body(&event.body)?)
    } else {
        Bytes::from(event.body)
    };

    let headers = decode_headers(&event.headers);
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(|v| Host(v.to_string()));

    let mut req = Request::new(RequestBody::new(body));
    *req.method_mut() = method;
    *req.uri_mut() = uri;
    *req.version_mut() = Version::HTTP_11;
    *req.headers_mut() = headers;
    if let Some(host) = host {
        req.extensions_mut().insert(host);
    }
    Ok(req)
}

/// Line breaks are skipped, so base64 wrapped at a fixed width decodes like the unwrapped form.
fn decode_base64_body(body: &str) -> Result<Vec<u8>> {
    if !body.contains(|c: char| c == '\r' || c == '\n') {
        return Ok(STANDARD.decode(body)?);
    }
    let unwrapped = body
        .bytes()
        .filter(|b| !matches!(b, b'\r' | b'\n'))
        .collect::<Vec<u8>>();
    Ok(STANDARD.decode(unwrapped)?)
}

fn decode_headers(raw: &HashMap<String, String>) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(raw.len());
    for (name, value) in raw {
        let name_parsed = HeaderName::from_bytes(name.as_bytes());
        let value_parsed = HeaderValue::from_str(value);
        match (name_parsed, value_parsed) {
            (Ok(n), Ok(v)) => {
                headers.insert(n, v);
            }
            _ => tracing::warn!(header = %name, "dropping header that is not valid http"),
        }
    }
    headers
}
