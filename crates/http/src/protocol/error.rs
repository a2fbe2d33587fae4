use std::error::Error;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// The error type an application returns from its callback.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Errors that end a single connection.
///
/// Nothing of this type ever leaves the connection boundary: it is traced and
/// the socket is closed.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("application error: {source}")]
    Application { source: BoxError },

    #[error("application panicked")]
    ApplicationPanic,
}

impl HttpError {
    pub fn application(source: BoxError) -> Self {
        Self::Application { source }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("unsupported transfer-encoding: {value}")]
    UnsupportedTransferEncoding { value: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("connection closed before the request header was complete, {received} bytes received")]
    IncompleteHeader { received: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn unsupported_transfer_encoding<S: ToString>(str: S) -> Self {
        Self::UnsupportedTransferEncoding { value: str.to_string() }
    }

    pub fn incomplete_header(received: usize) -> Self {
        Self::IncompleteHeader { received }
    }

    pub fn incomplete_body(remaining: u64) -> Self {
        Self::invalid_body(format!("connection closed with {remaining} body bytes outstanding"))
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("response head has already been sent")]
    HeadAlreadySent,

    #[error("response has already been finished")]
    Finished,

    #[error("response body exceeds the declared content-length {declared}")]
    BodyTooLong { declared: u64 },

    #[error("response body ended after {written} bytes, but content-length declared {declared}")]
    BodyTooShort { declared: u64, written: u64 },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }
}

/// Errors surfaced synchronously from the start operation.
///
/// When one of these is returned no listener is left open.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("can't resolve host {host}: {source}")]
    Resolve { host: String, source: io::Error },

    #[error("host {host} resolved to no address")]
    Unresolvable { host: String },

    #[error("can't bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ServerError {
    pub fn bind(addr: SocketAddr, source: io::Error) -> Self {
        Self::Bind { addr, source }
    }
}
