//! Response capture and `http` -> ALB envelope encoding.

use std::{collections::HashMap, fmt, io};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::{
    header::{CONTENT_TYPE, TRANSFER_ENCODING},
    HeaderMap, HeaderValue, StatusCode,
};

use crate::{event::AlbResponse, sniff};

/// Sink the handler writes its response into.
///
/// The status defaults to `200 OK`. The response is committed by [`write_head`](Self::write_head)
/// or by the first body write: the status and a snapshot of the headers are taken at that point,
/// and later changes to either are not sent. If the first body write happens before any
/// `Content-Type` or `Transfer-Encoding` header is set, a content type is sniffed from that
/// chunk.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    status: StatusCode,
    headers: HeaderMap,
    sent_headers: Option<HeaderMap>,
    body: Vec<u8>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        if self.is_committed() {
            tracing::warn!(
                current = self.status.as_u16(),
                ignored = status.as_u16(),
                "status already written"
            );
            return;
        }
        self.status = status;
    }

    /// Set the status and commit the response.
    pub fn write_head(&mut self, status: StatusCode) {
        self.set_status(status);
        self.commit(None);
    }

    /// Headers the handler is building. Edits made after the response is committed are kept here
    /// but not sent.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn write_body(&mut self, data: &[u8]) {
        self.commit(Some(data));
        self.body.extend_from_slice(data);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_committed(&self) -> bool {
        self.sent_headers.is_some()
    }

    /// `"<code> <reason>"`, or just the code for statuses without a canonical reason.
    pub fn status_line(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("{} {}", self.status.as_str(), reason),
            None => self.status.as_str().to_string(),
        }
    }

    /// Response sent when a handler panics under [`crate::FaultPolicy::Respond500`].
    pub(crate) fn internal_error() -> Self {
        let mut res = Self::new();
        res.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(sniff::TEXT_PLAIN));
        res.write_head(StatusCode::INTERNAL_SERVER_ERROR);
        res.write_body(b"internal error");
        res
    }

    /// Encode into the envelope returned to ALB.
    ///
    /// Repeated headers are joined with `,`, which is lossy for `set-cookie`. Header names come
    /// out lowercase (`content-type`, not `Content-Type`) because that is how
    /// [`http::HeaderName`] stores them; ALB matches names case-insensitively. A body that is not
    /// valid UTF-8 is base64-encoded.
    pub fn into_alb_response(mut self) -> AlbResponse {
        self.commit(None);
        let status_description = self.status_line();
        let headers = join_headers(self.sent_headers.as_ref().unwrap_or(&self.headers));
        let (body, is_base64_encoded) = match String::from_utf8(self.body) {
            Ok(text) => (text, false),
            Err(err) => (STANDARD.encode(err.into_bytes()), true),
        };

        AlbResponse {
            status_code: self.status.as_u16(),
            status_description,
            headers,
            body,
            is_base64_encoded,
        }
    }

    fn commit(&mut self, first_chunk: Option<&[u8]>) {
        if self.is_committed() {
            return;
        }
        if let Some(chunk) = first_chunk.filter(|c| !c.is_empty()) {
            if !self.headers.contains_key(CONTENT_TYPE)
                && !self.headers.contains_key(TRANSFER_ENCODING)
            {
                self.headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static(sniff::sniff_content_type(chunk)),
                );
            }
        }
        self.sent_headers = Some(self.headers.clone());
    }
}

impl io::Write for ResponseRecorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Write for ResponseRecorder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_body(s.as_bytes());
        Ok(())
    }
}

fn join_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut out = HashMap::with_capacity(headers.keys_len());
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .collect::<Vec<_>>()
            .join(",");
        out.insert(name.as_str().to_string(), joined);
    }
    out
}
