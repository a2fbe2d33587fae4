use bytes::BytesMut;
use http::header::{CONNECTION, CONTENT_LENGTH};
use http::{HeaderMap, HeaderValue, Response, StatusCode, Version};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::codec::HeaderEncoder;
use crate::ensure;
use crate::protocol::{has_connection_token, RequestHeader, ResponseHead, SendError};
use crate::socket::Socket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    /// Status and headers may still change.
    Head,
    /// The head is encoded; only body bytes follow.
    Body { declared: Option<u64> },
    Finished,
}

/// Buffers one response and decides its framing.
///
/// Body bytes accumulate in memory until the application flushes, the
/// optional threshold is crossed, or the connection finishes the response.
/// If the head goes out at finish, `Content-Length` is the number of bytes
/// written. If it goes out earlier and the application declared no length,
/// the body is delimited by closing the connection.
#[derive(Debug)]
pub struct ResponseWriter {
    head: ResponseHead,
    state: WriterState,
    buffer: BytesMut,
    threshold: Option<usize>,
    request_keep_alive: bool,
    head_only: bool,
    close_delimited: bool,
    written: u64,
    flushed: u64,
}

impl ResponseWriter {
    pub(crate) fn new(request: &RequestHeader, threshold: Option<usize>) -> Self {
        let mut head = Response::new(());
        *head.version_mut() = request.version();

        Self {
            head,
            state: WriterState::Head,
            buffer: BytesMut::new(),
            threshold,
            request_keep_alive: request.keep_alive(),
            head_only: request.is_head(),
            close_delimited: false,
            written: 0,
            flushed: 0,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.head.status()
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<(), SendError> {
        ensure!(self.state == WriterState::Head, SendError::HeadAlreadySent);
        *self.head.status_mut() = status;
        Ok(())
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    pub fn headers_mut(&mut self) -> Result<&mut HeaderMap, SendError> {
        ensure!(self.state == WriterState::Head, SendError::HeadAlreadySent);
        Ok(self.head.headers_mut())
    }

    pub fn is_head_sent(&self) -> bool {
        self.state != WriterState::Head
    }

    pub fn is_finished(&self) -> bool {
        self.state == WriterState::Finished
    }

    /// Body bytes accepted so far, including bytes suppressed for `HEAD`.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Bytes handed to the socket so far, head included.
    pub fn flushed(&self) -> u64 {
        self.flushed
    }

    /// Bytes waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the connection may serve another request after this response.
    pub fn keep_alive(&self) -> bool {
        self.request_keep_alive && !self.close_delimited && !has_connection_token(self.head.headers(), "close")
    }

    /// Buffers `data`. Returns true when the buffer reached the flush threshold.
    pub fn write(&mut self, data: &[u8]) -> Result<bool, SendError> {
        let declared = match self.state {
            WriterState::Head => declared_length(self.head.headers())?,
            WriterState::Body { declared } => declared,
            WriterState::Finished => return Err(SendError::Finished),
        };

        let written = self.written + data.len() as u64;
        if let Some(declared) = declared.filter(|_| !self.head_only) {
            ensure!(written <= declared, SendError::BodyTooLong { declared });
        }
        self.written = written;

        if !self.head_only {
            self.buffer.extend_from_slice(data);
        }
        Ok(self.threshold.is_some_and(|threshold| self.buffer.len() >= threshold))
    }

    /// Sends the head, if still pending, and everything buffered.
    pub async fn flush<S>(&mut self, socket: &mut S) -> Result<(), SendError>
    where
        S: Socket + ?Sized,
    {
        match self.state {
            WriterState::Head => {
                self.encode_head(false)?;
            }
            WriterState::Body { .. } => {}
            WriterState::Finished => return Err(SendError::Finished),
        }
        self.send_buffer(socket).await
    }

    /// Completes the response. Calling it again is a no-op.
    pub(crate) async fn finish<S>(&mut self, socket: &mut S) -> Result<(), SendError>
    where
        S: Socket + ?Sized,
    {
        let declared = match self.state {
            WriterState::Head => self.encode_head(true)?,
            WriterState::Body { declared } => declared,
            WriterState::Finished => return Ok(()),
        };
        self.state = WriterState::Finished;

        // a HEAD response may declare the length of the body it omits
        if let Some(declared) = declared.filter(|_| !self.head_only) {
            ensure!(self.written >= declared, SendError::BodyTooShort { declared, written: self.written });
        }
        self.send_buffer(socket).await
    }

    /// Encodes the head in front of the buffered body and returns the
    /// application declared length, if any.
    fn encode_head(&mut self, last: bool) -> Result<Option<u64>, SendError> {
        let declared = declared_length(self.head.headers())?;
        if is_bodyless(self.head.status()) {
            self.buffer.clear();
            self.head_only = true;
        }

        let content_length = match declared {
            Some(_) => None,
            None if is_bodyless(self.head.status()) => None,
            None if last => Some(self.written),
            None => {
                self.close_delimited = true;
                None
            }
        };

        let keep_alive = self.keep_alive();
        let version = self.head.version();
        let headers = self.head.headers_mut();
        if !keep_alive {
            if !has_connection_token(headers, "close") {
                headers.insert(CONNECTION, HeaderValue::from_static("close"));
            }
        } else if version == Version::HTTP_10 {
            headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        }

        let mut head = Response::new(());
        *head.status_mut() = self.head.status();
        *head.version_mut() = version;
        *head.headers_mut() = self.head.headers().clone();

        let mut encoded = BytesMut::new();
        HeaderEncoder.encode((head, content_length), &mut encoded)?;
        trace!(head_bytes = encoded.len(), ?content_length, "encoded response head");

        encoded.unsplit(self.buffer.split());
        self.buffer = encoded;
        self.state = WriterState::Body { declared };
        Ok(declared)
    }

    async fn send_buffer<S>(&mut self, socket: &mut S) -> Result<(), SendError>
    where
        S: Socket + ?Sized,
    {
        if self.buffer.is_empty() {
            return Ok(());
        }

        socket.send_all(&self.buffer).await?;
        self.flushed += self.buffer.len() as u64;
        self.buffer.clear();
        Ok(())
    }
}

/// 1xx and 204 responses carry neither a body nor `Content-Length`.
fn is_bodyless(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT
}

fn declared_length(headers: &HeaderMap) -> Result<Option<u64>, SendError> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| SendError::invalid_body("content-length set by the application is not a number"))
}
