//! HTTP response header handling implementation.
//!
//! The standard `http::Response` type with an empty body placeholder represents
//! the response head the application fills in before the body is streamed.

use http::Response;

/// Type alias for HTTP response headers.
///
/// This type represents the header portion of an HTTP response, using
/// `http::Response<()>` with an empty body placeholder.
pub type ResponseHead = Response<()>;
