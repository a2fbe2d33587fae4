//! A small asynchronous HTTP/1.x server
//!
//! This crate accepts TCP connections, parses HTTP/1.0 and HTTP/1.1 requests
//! and hands each one to an application callback, which writes the response
//! through a buffered stream. It is built on tokio and keeps the surface
//! intentionally small.
//!
//! # Features
//!
//! - HTTP/1.0 and HTTP/1.1 request parsing with header size and count limits
//! - Fixed-length request bodies, readable or left for the server to discard
//! - Keep-alive connections
//! - Buffered responses with automatic `Content-Length`, or streamed
//!   close-delimited responses
//! - Synchronous, idempotent shutdown through [`ServerHandle`]
//! - Pluggable lifecycle tracing through [`trace::ServerTrace`]
//!
//! # Example
//!
//! ```no_run
//! use micro_httpd::handler::handler_fn;
//! use micro_httpd::server::Server;
//! use tracing::{error, info, Level};
//! use tracing_subscriber::FmtSubscriber;
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//!     let app = handler_fn(|env| {
//!         Box::pin(async move {
//!             info!(path = env.path(), "request received");
//!             let body = env.body().read_to_end().await?;
//!
//!             let mut response = env.response();
//!             response.headers_mut()?.insert(http::header::CONTENT_TYPE, "text/plain".parse()?);
//!             response.write(b"Hello World! you sent ").await?;
//!             response.write(format!("{} bytes\r\n", body.len()).as_bytes()).await?;
//!             Ok(())
//!         })
//!     });
//!
//!     let handle = match Server::start(8080, app).await {
//!         Ok(handle) => handle,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let _ = tokio::signal::ctrl_c().await;
//!     handle.stopped().await;
//! }
//! ```
//!
//! # Architecture
//!
//! - [`server`]: binding, the accept loop and [`ServerHandle`]
//! - [`connection`]: the per-connection request cycle, [`Environment`] and
//!   the response writer
//! - [`handler`]: the [`Application`] contract
//! - [`codec`]: request head decoding, body framing and response head encoding
//! - [`protocol`]: request/response types and errors
//! - [`socket`]: the transport seam under a connection
//! - [`config`] and [`trace`]: configuration and observability
//!
//! # Error Handling
//!
//! Only [`protocol::ServerError`] reaches the caller, from the start
//! functions. Everything that goes wrong on a connection, from a malformed
//! request to an application error or a failed write, closes that connection
//! and is reported through tracing.
//!
//! # Limitations
//!
//! - HTTP/1.x only, no TLS
//! - No chunked transfer-encoding, in either direction
//! - No request timeouts
//! - Default limits: 8KB of headers, 64 header fields

pub mod codec;
pub mod config;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod socket;
pub mod trace;

mod utils;
pub(crate) use utils::ensure;

pub use config::ServerConfig;
pub use connection::Environment;
pub use handler::{handler_fn, Application};
pub use server::{BindTarget, Server, ServerHandle};
