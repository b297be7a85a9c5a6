//! Translation errors.
//!
//! Every error aborts the whole invocation: no request reaches the handler and no envelope is
//! produced. The host runtime reports the failure back to the load balancer.

/// Failure to translate an ALB event into a request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `isBase64Encoded` was set but the body is not valid standard base64.
    #[error("decode request body: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A `%` in the path or query is not followed by two hex digits.
    #[error("invalid percent-escape in {component}: {input:?}")]
    Escape {
        component: &'static str,
        input: String,
    },

    /// The reassembled request target was rejected by the URI parser.
    #[error("parse request target: {0}")]
    Uri(#[from] http::uri::InvalidUri),

    /// `httpMethod` is not a valid HTTP method token.
    #[error("parse request method: {0}")]
    Method(#[from] http::method::InvalidMethod),
}

impl Error {
    /// Malformed encoded input (base64 body or percent-escapes).
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Base64(_) | Self::Escape { .. })
    }

    /// Input that decoded fine but does not form a valid request line.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Uri(_) | Self::Method(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
