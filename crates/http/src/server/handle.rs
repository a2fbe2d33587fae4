use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::server::acceptor::ListenerSlot;
use crate::trace::{ServerTrace, TraceEventType, TraceMessage};

/// Controls a running server.
///
/// Closing stops accepting new connections and releases the port before
/// returning. Connections already accepted keep running until they finish on
/// their own. Dropping the handle closes the server.
#[must_use = "dropping the handle stops the server"]
pub struct ServerHandle {
    local_addr: SocketAddr,
    listener: ListenerSlot,
    stop: CancellationToken,
    accept_loop: Option<JoinHandle<()>>,
    trace: Arc<dyn ServerTrace>,
}

impl ServerHandle {
    pub(crate) fn new(
        local_addr: SocketAddr,
        listener: ListenerSlot,
        stop: CancellationToken,
        accept_loop: JoinHandle<()>,
        trace: Arc<dyn ServerTrace>,
    ) -> Self {
        Self { local_addr, listener, stop, accept_loop: Some(accept_loop), trace }
    }

    /// The address the server is bound to, with the real port when started
    /// on port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Stops the server. Safe to call more than once.
    ///
    /// The stop flag is set before the listener is closed, so the accept loop
    /// treats the failure of its pending accept as shutdown.
    pub fn close(&self) {
        self.stop.cancel();

        let listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(listener) = listener {
            drop(listener);
            self.trace.event(TraceEventType::Stop, TraceMessage::Server);
            info!(addr = %self.local_addr, "server stopped listening");
        }
    }

    /// Closes the server and waits for the accept loop to exit.
    pub async fn stopped(mut self) {
        self.close();
        if let Some(accept_loop) = self.accept_loop.take() {
            if let Err(e) = accept_loop.await {
                warn!(cause = %e, "accept loop ended abnormally");
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerHandle")
            .field("local_addr", &self.local_addr)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
