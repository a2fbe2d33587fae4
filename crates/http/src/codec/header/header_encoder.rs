//! HTTP header encoder implementation for serializing HTTP response heads
//!
//! Serializes the status line and header fields of a [`ResponseHead`] into raw
//! bytes. The status line echoes the version of the request being answered.

use crate::protocol::{ResponseHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{header, Version};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP response heads implementing the [`Encoder`] trait.
///
/// The item is the head plus an optional body length. `Some(n)` sets the
/// `Content-Length` header to `n`; `None` leaves the head untouched, which
/// callers use for close-delimited bodies or an application supplied length.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, Option<u64>)> for HeaderEncoder {
    type Error = SendError;

    /// Encodes HTTP response headers into the provided bytes buffer.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP version is neither HTTP/1.0 nor HTTP/1.1
    fn encode(&mut self, item: (ResponseHead, Option<u64>), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, content_length) = item;

        let version = match head.version() {
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_11 => "HTTP/1.1",
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        };

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "{} {} {}\r\n", version, head.status().as_str(), head.status().canonical_reason().unwrap_or(""))?;

        if let Some(n) = content_length {
            head.headers_mut().insert(header::CONTENT_LENGTH, n.into());
        }

        for (header_name, header_value) in head.headers() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Adapts `BytesMut` to `io::Write` so the status line can use `write!`.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
