//! Per-connection request processing.
//!
//! A [`Connection`] owns one accepted socket and runs the request cycle on it:
//!
//! ```text
//! ReadingHeaders -> InvokingApplication -> WritingResponse -> Draining
//!       ^                                                        |
//!       +---------------------- keep-alive ----------------------+
//! ```
//!
//! Any failure, or a response that cannot be followed by another one, moves
//! the connection to `Closed`. The application sees each request through an
//! [`Environment`], reading the body via [`RequestBody`] and writing the
//! response via [`ResponseStream`].

mod environment;
mod http_connection;
mod response_writer;
mod transport;

pub use environment::{Environment, RequestBody, ResponseStream};
pub use http_connection::Connection;
pub use response_writer::ResponseWriter;
