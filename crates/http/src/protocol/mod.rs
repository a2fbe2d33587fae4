//! Core HTTP protocol types.
//!
//! - [`RequestHeader`]: the parsed request head plus keep-alive rules
//! - [`ResponseHead`]: the response status line and headers before they are sent
//! - [`PayloadItem`] and [`PayloadSize`]: request body framing
//! - [`HttpError`], [`ParseError`], [`SendError`] and [`ServerError`]: error types
//!
//! These are used through the connection layer; applications mostly meet
//! them as return types of [`Environment`](crate::connection::Environment)
//! methods.

mod message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;
pub(crate) use request::has_connection_token;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::BoxError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
pub use error::ServerError;
