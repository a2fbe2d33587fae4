use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::codec::Decoder;
use tracing::{debug, error, info, warn};

use crate::codec::HeaderDecoder;
use crate::config::ServerConfig;
use crate::connection::environment::Environment;
use crate::connection::transport::Transport;
use crate::handler::Application;
use crate::protocol::{HttpError, ParseError, PayloadSize, RequestHeader};
use crate::socket::Socket;
use crate::trace::{ServerTrace, TraceEventType, TraceMessage};

/// Where a connection is in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    ReadingHeaders,
    InvokingApplication,
    WritingResponse,
    Draining,
    Closed,
}

enum Next {
    KeepAlive,
    Close,
}

/// One accepted client connection.
///
/// A connection serves requests one at a time: parse a head, run the
/// application, finish the response, then either wait for the next request
/// or close. Every error ends the connection. None of them escape
/// [`execute`](Connection::execute); they are traced instead.
pub struct Connection {
    transport: Transport,
    app: Arc<dyn Application>,
    trace: Arc<dyn ServerTrace>,
    header_decoder: HeaderDecoder,
    write_buffer_threshold: Option<usize>,
    state: ConnectionState,
}

impl Connection {
    pub fn new<S>(socket: S, app: Arc<dyn Application>, config: &ServerConfig) -> Self
    where
        S: Socket + 'static,
    {
        Self {
            transport: Transport::new(Box::new(socket), config.read_buffer_capacity()),
            app,
            trace: Arc::clone(config.trace()),
            header_decoder: HeaderDecoder::new(config.max_header_bytes(), config.max_headers()),
            write_buffer_threshold: config.write_buffer_threshold(),
            state: ConnectionState::ReadingHeaders,
        }
    }

    /// Serves requests until the client leaves or something fails, then
    /// closes the socket. The socket is closed exactly once on every path.
    pub async fn execute(mut self) {
        self.trace.event(TraceEventType::Verbose, TraceMessage::ConnectionExecute);

        match self.serve().await {
            Ok(()) => debug!("finished process, connection shutdown"),
            Err(e) => self.report(&e),
        }

        self.close().await;
    }

    async fn serve(&mut self) -> Result<(), HttpError> {
        loop {
            self.state = ConnectionState::ReadingHeaders;
            let Some((request, payload_size)) = self.read_header().await? else {
                return Ok(());
            };

            match self.exchange(request, payload_size).await? {
                Next::KeepAlive => {}
                Next::Close => return Ok(()),
            }
        }
    }

    /// Reads until a full request head is buffered. `None` means the client
    /// closed cleanly between requests.
    async fn read_header(&mut self) -> Result<Option<(RequestHeader, PayloadSize)>, ParseError> {
        loop {
            if let Some(parsed) = self.header_decoder.decode(&mut self.transport.read_buf)? {
                return Ok(Some(parsed));
            }

            if self.transport.fill().await? == 0 {
                return match self.transport.read_buf.len() {
                    0 => Ok(None),
                    received => Err(ParseError::incomplete_header(received)),
                };
            }
        }
    }

    async fn exchange(&mut self, request: RequestHeader, payload_size: PayloadSize) -> Result<Next, HttpError> {
        self.state = ConnectionState::InvokingApplication;
        debug!(method = %request.method(), path = request.path(), version = ?request.version(), "request received");

        let mut env = Environment::new(request, payload_size, &mut self.transport, self.write_buffer_threshold);

        match AssertUnwindSafe(self.app.call(&mut env)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(HttpError::application(e)),
            Err(_) => return Err(HttpError::ApplicationPanic),
        }

        self.state = ConnectionState::WritingResponse;
        env.finish().await?;

        self.state = ConnectionState::Draining;
        if !env.writer().keep_alive() {
            return Ok(Next::Close);
        }

        let skipped = env.skip_body().await?;
        if skipped > 0 {
            debug!(skipped, "discarded unread request body");
        }
        Ok(Next::KeepAlive)
    }

    fn report(&self, e: &HttpError) {
        let state = self.state;
        let message = match e {
            HttpError::RequestError { .. } => {
                warn!(cause = %e, ?state, "malformed request, connection shutdown");
                TraceMessage::ConnectionMalformedRequest
            }
            HttpError::Application { .. } | HttpError::ApplicationPanic => {
                error!(cause = %e, ?state, "application failed, connection shutdown");
                TraceMessage::ConnectionApplicationError
            }
            HttpError::ResponseError { .. } => {
                warn!(cause = %e, ?state, "can't send response, connection shutdown");
                TraceMessage::ConnectionWriteError
            }
        };
        self.trace.event(TraceEventType::Error, message);
    }

    async fn close(&mut self) {
        self.state = ConnectionState::Closed;
        self.transport.socket.close().await;
        self.trace.event(TraceEventType::Verbose, TraceMessage::ConnectionClosed);
        info!("connection closed");
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("transport", &self.transport)
            .field("header_decoder", &self.header_decoder)
            .finish_non_exhaustive()
    }
}
