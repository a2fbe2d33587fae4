//! HTTP codec module for encoding and decoding HTTP/1.x messages
//!
//! The codecs implement the `tokio_util` [`Decoder`](tokio_util::codec::Decoder)
//! and [`Encoder`](tokio_util::codec::Encoder) traits over `BytesMut` buffers,
//! and are driven by the connection's own read buffer and response writer.
//!
//! # Architecture
//!
//! - Request handling:
//!   - [`HeaderDecoder`]: request line and header block
//!   - [`PayloadDecoder`]: fixed-length request bodies
//!
//! - Response handling:
//!   - [`HeaderEncoder`]: status line and header fields
//!
//! # Example
//!
//! ```
//! use micro_httpd::codec::HeaderDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut buffer = BytesMut::from("GET / HTTP/1.1\r\nHost: localhost\r\n\r\n");
//! let (header, payload_size) = HeaderDecoder::default().decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(header.path(), "/");
//! assert!(payload_size.is_empty());
//! ```

mod body;
mod header;

pub use body::PayloadDecoder;
pub use header::{DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_HEADER_NUM};
pub use header::{HeaderDecoder, HeaderEncoder};
