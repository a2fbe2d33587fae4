//! Observability sink for server lifecycle events.
//!
//! The server reports a fixed catalog of [`TraceMessage`]s at one of four
//! [`TraceEventType`] severities. Sinks only observe: nothing they do feeds
//! back into the accept loop or a connection.
//!
//! [`TracingTrace`], the default sink, forwards every event to the `tracing`
//! crate. Install a subscriber (for example `tracing_subscriber::fmt`) to see
//! them.

use std::fmt;

use tracing::{error, info, trace};

/// Severity of a trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEventType {
    Start,
    Stop,
    Verbose,
    Error,
}

/// Catalog of events reported by the acceptor and connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceMessage {
    /// The server started listening, or was asked to stop.
    Server,
    /// The accept loop began, or ended.
    AcceptLoop,
    /// An accept was issued on the listening socket.
    AcceptIssued,
    /// An accept completed without suspending.
    AcceptCompletedSync,
    /// An accept completed after suspending.
    AcceptCompletedAsync,
    /// An accept failed; the loop keeps going.
    AcceptSocketError,
    /// An accepted connection was handed to the worker pool.
    ConnectionDispatched,
    /// A worker started executing a connection.
    ConnectionExecute,
    /// The request head was incomplete or could not be parsed.
    ConnectionMalformedRequest,
    /// The application returned an error or panicked.
    ConnectionApplicationError,
    /// Sending the response failed.
    ConnectionWriteError,
    /// The connection's socket was closed.
    ConnectionClosed,
}

impl TraceMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceMessage::Server => "server",
            TraceMessage::AcceptLoop => "accept_loop",
            TraceMessage::AcceptIssued => "accept_issued",
            TraceMessage::AcceptCompletedSync => "accept_completed_sync",
            TraceMessage::AcceptCompletedAsync => "accept_completed_async",
            TraceMessage::AcceptSocketError => "accept_socket_error",
            TraceMessage::ConnectionDispatched => "connection_dispatched",
            TraceMessage::ConnectionExecute => "connection_execute",
            TraceMessage::ConnectionMalformedRequest => "connection_malformed_request",
            TraceMessage::ConnectionApplicationError => "connection_application_error",
            TraceMessage::ConnectionWriteError => "connection_write_error",
            TraceMessage::ConnectionClosed => "connection_closed",
        }
    }
}

impl fmt::Display for TraceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sink for server trace events.
///
/// Implementations are shared by the acceptor and every connection at once,
/// so they must be cheap and thread safe.
pub trait ServerTrace: Send + Sync {
    fn event(&self, event_type: TraceEventType, message: TraceMessage);
}

/// Forwards events to `tracing`: `Start`/`Stop` at info, `Verbose` at trace,
/// `Error` at error.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTrace;

impl ServerTrace for TracingTrace {
    fn event(&self, event_type: TraceEventType, message: TraceMessage) {
        match event_type {
            TraceEventType::Start => info!(event = %message, "start"),
            TraceEventType::Stop => info!(event = %message, "stop"),
            TraceEventType::Verbose => trace!(event = %message),
            TraceEventType::Error => error!(event = %message, "server error event"),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTrace;

impl ServerTrace for NoopTrace {
    fn event(&self, _event_type: TraceEventType, _message: TraceMessage) {}
}
