//! HTTP header processing module for encoding and decoding headers
//!
//! # Components
//!
//! - [`HeaderDecoder`]: Decodes HTTP request heads from raw bytes
//!   - Supports HTTP/1.0 and HTTP/1.1 request lines
//!   - Enforces header count and size limits
//!   - Selects the request body framing
//!
//! - [`HeaderEncoder`]: Encodes HTTP response heads to bytes
//!   - Status line matching the request version
//!   - Content-Length handling

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_decoder::{DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_HEADER_NUM};
pub use header_encoder::HeaderEncoder;
