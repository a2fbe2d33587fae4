use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::handler::Application;
use crate::socket::TcpSocket;
use crate::trace::{TraceEventType, TraceMessage};

/// The listening socket, shared between the accept loop and the handle that
/// closes it. `None` once closed.
pub(crate) type ListenerSlot = Arc<Mutex<Option<TcpListener>>>;

/// Pause after an accept error that is not about a single connection, such
/// as running out of file descriptors, so the loop does not spin on it.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

pub(crate) struct Acceptor {
    listener: ListenerSlot,
    stop: CancellationToken,
    app: Arc<dyn Application>,
    config: ServerConfig,
    runtime: Handle,
}

impl Acceptor {
    pub(crate) fn new(
        listener: ListenerSlot,
        stop: CancellationToken,
        app: Arc<dyn Application>,
        config: ServerConfig,
        runtime: Handle,
    ) -> Self {
        Self { listener, stop, app, config, runtime }
    }

    /// Accepts until the stop token is cancelled.
    ///
    /// An accept that is ready on the first poll is handled without
    /// suspending. After `max_sync_accepts` of those in a row the loop yields
    /// once, so a flood of ready connections cannot starve other tasks.
    pub(crate) async fn run(self) {
        let trace = Arc::clone(self.config.trace());
        trace.event(TraceEventType::Start, TraceMessage::AcceptLoop);

        let mut sync_accepts = 0;
        while !self.stop.is_cancelled() {
            trace.event(TraceEventType::Verbose, TraceMessage::AcceptIssued);

            let accepted = match poll_fn(|cx| Poll::Ready(self.poll_accept(cx))).await {
                Poll::Ready(accepted) => {
                    trace.event(TraceEventType::Verbose, TraceMessage::AcceptCompletedSync);
                    sync_accepts += 1;
                    accepted
                }
                Poll::Pending => {
                    sync_accepts = 0;
                    select! {
                        biased;
                        () = self.stop.cancelled() => break,
                        accepted = poll_fn(|cx| self.poll_accept(cx)) => {
                            trace.event(TraceEventType::Verbose, TraceMessage::AcceptCompletedAsync);
                            accepted
                        }
                    }
                }
            };

            match accepted {
                Ok((stream, remote_addr)) => self.dispatch(stream, remote_addr),
                Err(e) if self.stop.is_cancelled() => {
                    debug!(cause = %e, "accept interrupted by shutdown");
                    break;
                }
                Err(e) => {
                    trace.event(TraceEventType::Error, TraceMessage::AcceptSocketError);
                    warn!(cause = %e, "failed to accept");
                    if !is_connection_error(&e) {
                        select! {
                            () = self.stop.cancelled() => break,
                            () = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => {}
                        }
                    }
                }
            }

            if sync_accepts >= self.config.max_sync_accepts() {
                sync_accepts = 0;
                tokio::task::yield_now().await;
            }
        }

        trace.event(TraceEventType::Stop, TraceMessage::AcceptLoop);
    }

    fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<io::Result<(TcpStream, SocketAddr)>> {
        let listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        match listener.as_ref() {
            Some(listener) => listener.poll_accept(cx),
            None => Poll::Ready(Err(io::Error::new(io::ErrorKind::NotConnected, "listening socket closed"))),
        }
    }

    fn dispatch(&self, stream: TcpStream, remote_addr: SocketAddr) {
        if self.config.nodelay() {
            if let Err(e) = stream.set_nodelay(true) {
                debug!(cause = %e, %remote_addr, "can't set TCP_NODELAY");
            }
        }

        let connection = Connection::new(TcpSocket::new(stream), Arc::clone(&self.app), &self.config);
        self.runtime.spawn(connection.execute());

        self.config.trace().event(TraceEventType::Verbose, TraceMessage::ConnectionDispatched);
        debug!(%remote_addr, "connection dispatched");
    }
}

/// Errors that concern one incoming connection rather than the listener.
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset
    )
}
