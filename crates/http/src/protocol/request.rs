//! HTTP request header handling implementation.
//!
//! This module wraps the standard `http::Request` type to add the connection
//! management queries the server needs, such as the keep-alive decision.

use http::header::CONNECTION;
use http::{HeaderMap, Method, Request, Uri, Version};

/// Represents an HTTP request header.
///
/// This struct wraps a `http::Request<()>`: method, URI, version and the
/// multi-valued header map parsed from the request head.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl RequestHeader {
    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the path component of the request target.
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Whether the client allows the connection to be reused after this request.
    ///
    /// `Connection: close` always wins. Otherwise HTTP/1.1 defaults to
    /// keep-alive and HTTP/1.0 requires an explicit `Connection: keep-alive`.
    pub fn keep_alive(&self) -> bool {
        if has_connection_token(self.headers(), "close") {
            return false;
        }

        match self.version() {
            Version::HTTP_11 => true,
            Version::HTTP_10 => has_connection_token(self.headers(), "keep-alive"),
            _ => false,
        }
    }

    /// Returns true for `HEAD` requests, whose responses carry no body bytes.
    pub fn is_head(&self) -> bool {
        *self.method() == Method::HEAD
    }
}

/// Checks every `Connection` header value for a comma separated token,
/// ignoring ASCII case.
pub(crate) fn has_connection_token(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .flat_map(|value| value.as_bytes().split(|b| *b == b','))
        .any(|item| item.trim_ascii().eq_ignore_ascii_case(token.as_bytes()))
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
