//! Listening and accepting.
//!
//! [`Server`] binds a listening socket and spawns the accept loop, which
//! hands every accepted socket to its own [`Connection`](crate::connection::Connection)
//! task. The returned [`ServerHandle`] is the only way to stop it.
//!
//! ```no_run
//! use micro_httpd::handler::handler_fn;
//! use micro_httpd::server::Server;
//!
//! # async fn run() -> Result<(), micro_httpd::protocol::ServerError> {
//! let handle = Server::start(8080, handler_fn(|env| {
//!     Box::pin(async move {
//!         env.response().write(b"Hello World!\r\n").await?;
//!         Ok(())
//!     })
//! }))
//! .await?;
//!
//! tokio::signal::ctrl_c().await?;
//! handle.stopped().await;
//! # Ok(())
//! # }
//! ```

mod acceptor;
mod bind;
mod handle;

pub use bind::BindTarget;
pub use handle::ServerHandle;

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::handler::Application;
use crate::protocol::ServerError;
use crate::server::acceptor::Acceptor;
use crate::trace::{TraceEventType, TraceMessage};

/// Entry points for starting a server.
#[derive(Debug, Clone, Copy)]
pub struct Server;

impl Server {
    /// Listens on every IPv4 interface on `port` with the default configuration.
    pub async fn start<A>(port: u16, app: A) -> Result<ServerHandle, ServerError>
    where
        A: Application + 'static,
    {
        Self::start_with(ServerConfig::default(), BindTarget::Port(port), app).await
    }

    /// Resolves `hostname` and listens on the first address found.
    pub async fn start_on_host<A>(hostname: &str, port: u16, app: A) -> Result<ServerHandle, ServerError>
    where
        A: Application + 'static,
    {
        Self::start_with(ServerConfig::default(), BindTarget::Host(hostname.to_owned(), port), app).await
    }

    pub async fn start_on<A>(addr: SocketAddr, app: A) -> Result<ServerHandle, ServerError>
    where
        A: Application + 'static,
    {
        Self::start_with(ServerConfig::default(), BindTarget::Addr(addr), app).await
    }

    /// Binds `target` and starts accepting.
    ///
    /// Resolution and bind errors are returned here and leave nothing open.
    /// Once this returns `Ok`, the accept loop runs as a task on the
    /// configured runtime, or the current one. Starting outside of any tokio
    /// runtime without a configured one is an error.
    pub async fn start_with<A>(
        config: ServerConfig,
        target: impl Into<BindTarget>,
        app: A,
    ) -> Result<ServerHandle, ServerError>
    where
        A: Application + 'static,
    {
        let addr = target.into().resolve().await?;

        let runtime = match config.runtime() {
            Some(runtime) => runtime.clone(),
            None => Handle::try_current().map_err(io::Error::other)?,
        };
        // the listener registers with the reactor of the runtime it runs on
        let _runtime_guard = runtime.enter();

        let listener = bind::listen(addr, &config)?;
        let local_addr = listener.local_addr()?;

        let trace = Arc::clone(config.trace());
        trace.event(TraceEventType::Start, TraceMessage::Server);

        let listener = Arc::new(Mutex::new(Some(listener)));
        let stop = CancellationToken::new();

        let acceptor = Acceptor::new(Arc::clone(&listener), stop.clone(), Arc::new(app), config, runtime.clone());
        let accept_loop = runtime.spawn(acceptor.run());

        Ok(ServerHandle::new(local_addr, listener, stop, accept_loop, trace))
    }
}
