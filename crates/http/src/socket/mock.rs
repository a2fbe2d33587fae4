use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use crate::socket::Socket;

/// In-memory socket: input is a script of chunks, output is recorded.
///
/// When the script runs out, `receive` reports an orderly close.
#[derive(Debug, Default)]
pub(crate) struct MockSocket {
    input: VecDeque<Bytes>,
    output: Arc<Mutex<Vec<u8>>>,
    closes: Arc<AtomicUsize>,
    max_send: Option<usize>,
    fail_send: bool,
    closed: bool,
}

/// Observes a [`MockSocket`] after it has been moved into a connection.
#[derive(Debug, Clone)]
pub(crate) struct MockProbe {
    output: Arc<Mutex<Vec<u8>>>,
    closes: Arc<AtomicUsize>,
}

impl MockSocket {
    pub(crate) fn new<I, B>(chunks: I) -> (Self, MockProbe)
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let socket = Self { input: chunks.into_iter().map(Into::into).collect(), ..Self::default() };
        let probe = MockProbe { output: Arc::clone(&socket.output), closes: Arc::clone(&socket.closes) };
        (socket, probe)
    }

    /// Accept at most `n` bytes per send call.
    pub(crate) fn max_send(mut self, n: usize) -> Self {
        self.max_send = Some(n);
        self
    }

    /// Every send fails as if the remote reset the connection.
    pub(crate) fn fail_send(mut self) -> Self {
        self.fail_send = true;
        self
    }
}

impl MockProbe {
    pub(crate) fn output(&self) -> Vec<u8> {
        self.output.lock().unwrap().clone()
    }

    pub(crate) fn output_string(&self) -> String {
        String::from_utf8(self.output()).unwrap()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Socket for MockSocket {
    async fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        if self.fail_send {
            return Err(io::Error::from(io::ErrorKind::ConnectionReset));
        }
        let n = self.max_send.map_or(buf.len(), |max| max.min(buf.len()));
        self.output.lock().unwrap().extend_from_slice(&buf[..n]);
        Ok(n)
    }

    async fn receive(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        match self.input.pop_front() {
            Some(chunk) => {
                buf.extend_from_slice(&chunk);
                Ok(chunk.len())
            }
            None => Ok(0),
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
