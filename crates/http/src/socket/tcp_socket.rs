use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::socket::Socket;

/// [`Socket`] over a tokio [`TcpStream`].
///
/// Once closed, the stream is dropped and further sends or receives fail with
/// [`io::ErrorKind::NotConnected`]. A socket dropped without an explicit close
/// still releases its handle.
#[derive(Debug)]
pub struct TcpSocket {
    stream: Option<TcpStream>,
    peer_addr: Option<SocketAddr>,
}

impl TcpSocket {
    pub fn new(stream: TcpStream) -> Self {
        let peer_addr = stream.peer_addr().ok();
        Self { stream: Some(stream), peer_addr }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.stream.as_mut().ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
    }
}

#[async_trait]
impl Socket for TcpSocket {
    async fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream()?.write(buf).await
    }

    async fn receive(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        self.stream()?.read_buf(buf).await
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            // the FIN lets the remote observe end-of-stream after the last byte
            if let Err(e) = stream.shutdown().await {
                debug!(cause = %e, peer = ?self.peer_addr, "shutdown socket error");
            }
        }
    }
}
