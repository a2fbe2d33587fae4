use std::io;

use bytes::BytesMut;

use crate::socket::Socket;

/// A socket plus the bytes received from it but not yet consumed.
///
/// Bytes left in `read_buf` after one request belong to the next one, so the
/// buffer lives as long as the connection.
pub(crate) struct Transport {
    pub(crate) socket: Box<dyn Socket>,
    pub(crate) read_buf: BytesMut,
    read_capacity: usize,
}

impl Transport {
    pub(crate) fn new(socket: Box<dyn Socket>, read_capacity: usize) -> Self {
        Self { socket, read_buf: BytesMut::with_capacity(read_capacity), read_capacity }
    }

    /// Receives once into `read_buf`. `Ok(0)` means the remote closed.
    pub(crate) async fn fill(&mut self) -> io::Result<usize> {
        self.read_buf.reserve(self.read_capacity);
        self.socket.receive(&mut self.read_buf).await
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").field("buffered", &self.read_buf.len()).finish_non_exhaustive()
    }
}
