//! HTTP header decoder implementation for parsing HTTP request heads
//!
//! This module decodes the request line and header block from raw bytes into a
//! structured [`RequestHeader`], and determines how the request body is framed.
//!
//! # Features
//!
//! - Header parsing using `httparse`, values are sliced out of the read buffer
//!   without copying
//! - Support for HTTP/1.0 and HTTP/1.1
//! - Configurable protection against oversized header blocks
//! - Payload size selection from `Content-Length`
//!
//! # Limits
//!
//! The defaults are 64 headers and 8KB for the whole head. Both are set per
//! server through [`ServerConfig`](crate::ServerConfig).

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Method, Request, Uri};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, RequestHeader};

/// Default maximum number of headers allowed in a request
pub const DEFAULT_MAX_HEADER_NUM: usize = 64;

/// Default maximum size in bytes allowed for the entire header section
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// Shortest possible request head: `GET / HTTP/1.1\r\n\r\n` minus the path
const MIN_REQUEST_BYTES: usize = 14;

/// Decoder for HTTP request headers implementing the [`Decoder`] trait.
///
/// On success the header bytes are split off the front of the buffer, so what
/// remains is the start of the request body (or of the next request).
#[derive(Debug, Clone, Copy)]
pub struct HeaderDecoder {
    max_header_bytes: usize,
    max_headers: usize,
}

impl HeaderDecoder {
    pub fn new(max_header_bytes: usize, max_headers: usize) -> Self {
        Self { max_header_bytes, max_headers }
    }
}

impl Default for HeaderDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_HEADER_NUM)
    }
}

impl Decoder for HeaderDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    /// Attempts to decode HTTP headers from the provided bytes buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((header, payload_size)))` if a complete header was successfully parsed
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` if parsing failed
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if:
    /// - The number of headers exceeds the configured maximum
    /// - The header block exceeds the configured size
    /// - The HTTP version is not 1.0 or 1.1
    /// - Headers contain invalid characters
    /// - The body framing is unsupported or malformed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MIN_REQUEST_BYTES {
            return Ok(None);
        }

        let mut headers = vec![httparse::EMPTY_HEADER; self.max_headers];
        let mut req = httparse::Request::new(&mut headers);

        let parsed_result = req.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(self.max_headers),
            e => ParseError::invalid_header(e.to_string()),
        });

        match parsed_result? {
            Status::Complete(body_offset) => {
                trace!(header_size = body_offset, "parsed request header");
                ensure!(body_offset <= self.max_header_bytes, ParseError::too_large_header(body_offset, self.max_header_bytes));

                let header_count = req.headers.len();

                // Record byte ranges so values can be sliced from the frozen buffer
                let header_index = HeaderIndex::record(src, req.headers);

                let version = match req.version {
                    Some(0) => http::Version::HTTP_10,
                    Some(1) => http::Version::HTTP_11,
                    _ => return Err(ParseError::InvalidVersion(req.version)),
                };

                let method = Method::from_bytes(req.method.ok_or(ParseError::InvalidMethod)?.as_bytes())
                    .map_err(|_| ParseError::InvalidMethod)?;
                let uri = req.path.ok_or(ParseError::InvalidUri)?.parse::<Uri>().map_err(|_| ParseError::InvalidUri)?;

                let mut request = Request::new(());
                *request.method_mut() = method;
                *request.uri_mut() = uri;
                *request.version_mut() = version;

                let header_map = request.headers_mut();
                header_map.reserve(header_count);

                let header_bytes = src.split_to(body_offset).freeze();
                for index in &header_index {
                    let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1]).map_err(ParseError::invalid_header)?;
                    let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
                        .map_err(ParseError::invalid_header)?;

                    // repeated names keep every value, in arrival order
                    header_map.append(name, value);
                }

                let header = RequestHeader::from(request);
                let payload_size = parse_payload(&header)?;

                Ok(Some((header, payload_size)))
            }
            Status::Partial => {
                ensure!(src.len() <= self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
                Ok(None)
            }
        }
    }
}

/// Stores the byte range positions of a header's name and value within the original buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    /// Start and end byte positions of the header name
    name: (usize, usize),
    /// Start and end byte positions of the header value
    value: (usize, usize),
}

impl HeaderIndex {
    /// Records the byte positions of header names and values from the parsed headers.
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>]) -> Vec<HeaderIndex> {
        let bytes_ptr = bytes.as_ptr() as usize;
        headers
            .iter()
            .map(|header| {
                let name_start = header.name.as_ptr() as usize - bytes_ptr;
                let value_start = header.value.as_ptr() as usize - bytes_ptr;
                HeaderIndex {
                    name: (name_start, name_start + header.name.len()),
                    value: (value_start, value_start + header.value.len()),
                }
            })
            .collect()
    }
}

/// Determines the request payload size from the parsed headers.
///
/// Any `Transfer-Encoding` is refused since only fixed-length bodies are
/// supported. Repeated `Content-Length` headers must agree.
fn parse_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    if let Some(te_value) = header.headers().get(http::header::TRANSFER_ENCODING) {
        return Err(ParseError::unsupported_transfer_encoding(String::from_utf8_lossy(te_value.as_bytes())));
    }

    let mut length = None;
    for cl_value in header.headers().get_all(http::header::CONTENT_LENGTH) {
        let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
        let parsed =
            cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

        match length {
            Some(previous) if previous != parsed => {
                return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {parsed}")));
            }
            _ => length = Some(parsed),
        }
    }

    Ok(length.map_or(PayloadSize::new_empty(), PayloadSize::new_length))
}
