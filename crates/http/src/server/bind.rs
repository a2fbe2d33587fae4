use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::{lookup_host, TcpListener};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::protocol::ServerError;

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindTarget {
    /// Every IPv4 interface on the given port.
    Port(u16),
    /// A hostname, resolved once when the server starts.
    Host(String, u16),
    Addr(SocketAddr),
}

impl BindTarget {
    /// Resolves the target to the single address to bind.
    ///
    /// A hostname with several addresses binds the first one the resolver
    /// returns.
    pub async fn resolve(&self) -> Result<SocketAddr, ServerError> {
        match self {
            BindTarget::Port(port) => Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, *port))),
            BindTarget::Addr(addr) => Ok(*addr),
            BindTarget::Host(host, port) => {
                let mut addrs = lookup_host((host.as_str(), *port))
                    .await
                    .map_err(|source| ServerError::Resolve { host: host.clone(), source })?;

                let addr = addrs.next().ok_or_else(|| ServerError::Unresolvable { host: host.clone() })?;
                debug!(%host, %addr, "resolved bind host");
                Ok(addr)
            }
        }
    }
}

impl fmt::Display for BindTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindTarget::Port(port) => write!(f, "*:{port}"),
            BindTarget::Host(host, port) => write!(f, "{host}:{port}"),
            BindTarget::Addr(addr) => write!(f, "{addr}"),
        }
    }
}

impl From<u16> for BindTarget {
    fn from(port: u16) -> Self {
        BindTarget::Port(port)
    }
}

impl From<SocketAddr> for BindTarget {
    fn from(addr: SocketAddr) -> Self {
        BindTarget::Addr(addr)
    }
}

impl From<(&str, u16)> for BindTarget {
    fn from((host, port): (&str, u16)) -> Self {
        BindTarget::Host(host.to_owned(), port)
    }
}

/// Creates the listening socket for `addr` with the configured backlog.
pub(crate) fn listen(addr: SocketAddr, config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let socket = match addr {
        SocketAddr::V4(_) => tokio::net::TcpSocket::new_v4(),
        SocketAddr::V6(_) => tokio::net::TcpSocket::new_v6(),
    }
    .map_err(|e| ServerError::bind(addr, e))?;

    // same as `TcpListener::bind`: a restarted server may reuse a port in TIME_WAIT
    #[cfg(not(windows))]
    socket.set_reuseaddr(true).map_err(|e| ServerError::bind(addr, e))?;

    socket.bind(addr).map_err(|e| ServerError::bind(addr, e))?;
    let listener = socket.listen(config.backlog()).map_err(|e| ServerError::bind(addr, e))?;

    info!(%addr, backlog = config.backlog(), "start listening");
    Ok(listener)
}
