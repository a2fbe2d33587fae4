//! Transport seam between the connection state machine and the OS socket.
//!
//! [`Socket`] is deliberately tiny: send, receive and close. It does no
//! buffering and knows nothing about HTTP, so a [`Connection`](crate::connection::Connection)
//! can be driven by an in-memory fake in tests exactly as it is by a
//! [`TcpSocket`] in production.

mod tcp_socket;

#[cfg(test)]
pub(crate) mod mock;

pub use tcp_socket::TcpSocket;

use std::io;

use async_trait::async_trait;
use bytes::BytesMut;

/// A connected stream socket.
///
/// Every method takes `&mut self`: a socket has a single owner at any time,
/// which is what makes [`close`](Socket::close) release the OS handle exactly
/// once.
#[async_trait]
pub trait Socket: Send {
    /// Sends bytes from `buf`, waiting until the kernel accepts at least one
    /// byte or the operation fails. Returns how many bytes were accepted.
    async fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Receives into the spare capacity of `buf`, returning the number of
    /// bytes appended. `Ok(0)` signals an orderly close by the remote.
    async fn receive(&mut self, buf: &mut BytesMut) -> io::Result<usize>;

    /// Closes the socket. Calling it again is a no-op.
    async fn close(&mut self);

    /// Sends all of `buf`, looping over partial sends.
    async fn send_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.send(buf).await? {
                0 => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }
}
