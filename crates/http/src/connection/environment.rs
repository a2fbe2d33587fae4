use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Method, StatusCode, Uri, Version};
use tokio_util::codec::Decoder;

use crate::codec::PayloadDecoder;
use crate::connection::response_writer::ResponseWriter;
use crate::connection::transport::Transport;
use crate::protocol::{ParseError, PayloadItem, PayloadSize, RequestHeader, SendError};
use crate::socket::Socket;

/// Everything an application sees of one request.
///
/// The environment lives for a single request/response exchange. It borrows
/// the connection's socket and read buffer, so a body left unread here is
/// drained by the connection before the next request is parsed.
#[derive(Debug)]
pub struct Environment<'conn> {
    request: RequestHeader,
    body: PayloadDecoder,
    response: ResponseWriter,
    transport: &'conn mut Transport,
}

impl<'conn> Environment<'conn> {
    pub(crate) fn new(
        request: RequestHeader,
        payload_size: PayloadSize,
        transport: &'conn mut Transport,
        write_buffer_threshold: Option<usize>,
    ) -> Self {
        let response = ResponseWriter::new(&request, write_buffer_threshold);
        Self { request, body: payload_size.into(), response, transport }
    }

    pub fn request(&self) -> &RequestHeader {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn path(&self) -> &str {
        self.request.path()
    }

    pub fn version(&self) -> Version {
        self.request.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// The request body. Reading is optional.
    pub fn body(&mut self) -> RequestBody<'_> {
        RequestBody { decoder: &mut self.body, transport: &mut *self.transport }
    }

    /// The response being built for this request.
    pub fn response(&mut self) -> ResponseStream<'_> {
        ResponseStream { writer: &mut self.response, socket: &mut self.transport.socket }
    }

    pub(crate) fn writer(&self) -> &ResponseWriter {
        &self.response
    }

    pub(crate) async fn finish(&mut self) -> Result<(), SendError> {
        self.response.finish(&mut *self.transport.socket).await
    }

    /// Discards whatever the application left unread of the request body.
    pub(crate) async fn skip_body(&mut self) -> Result<u64, ParseError> {
        self.body().skip().await
    }
}

/// Reader over the request body, framed by its `Content-Length`.
#[derive(Debug)]
pub struct RequestBody<'env> {
    decoder: &'env mut PayloadDecoder,
    transport: &'env mut Transport,
}

impl RequestBody<'_> {
    /// Body bytes not yet returned.
    pub fn remaining(&self) -> u64 {
        self.decoder.remaining()
    }

    pub fn is_end(&self) -> bool {
        self.decoder.is_finish()
    }

    /// The next chunk of the body, `None` once it is exhausted.
    ///
    /// Chunk boundaries follow what the socket delivered, not what the
    /// client sent.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, ParseError> {
        loop {
            match self.decoder.decode(&mut self.transport.read_buf)? {
                Some(PayloadItem::Chunk(bytes)) => return Ok(Some(bytes)),
                Some(PayloadItem::Eof) => return Ok(None),
                None => {
                    if self.transport.fill().await? == 0 {
                        return Err(ParseError::incomplete_body(self.decoder.remaining()));
                    }
                }
            }
        }
    }

    /// Reads the rest of the body into one buffer.
    pub async fn read_to_end(&mut self) -> Result<Bytes, ParseError> {
        let mut body = BytesMut::new();
        while let Some(chunk) = self.chunk().await? {
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }

    pub(crate) async fn skip(&mut self) -> Result<u64, ParseError> {
        let mut skipped = 0;
        while let Some(chunk) = self.chunk().await? {
            skipped += chunk.len() as u64;
        }
        Ok(skipped)
    }
}

/// Writer for the response to the current request.
///
/// Status and headers can change until the head is sent, which happens on
/// the first flush or when the connection finishes the response.
pub struct ResponseStream<'env> {
    writer: &'env mut ResponseWriter,
    socket: &'env mut Box<dyn Socket>,
}

impl std::fmt::Debug for ResponseStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream").field("writer", &self.writer).finish_non_exhaustive()
    }
}

impl ResponseStream<'_> {
    pub fn status(&self) -> StatusCode {
        self.writer.status()
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<(), SendError> {
        self.writer.set_status(status)
    }

    pub fn headers(&self) -> &HeaderMap {
        self.writer.headers()
    }

    pub fn headers_mut(&mut self) -> Result<&mut HeaderMap, SendError> {
        self.writer.headers_mut()
    }

    pub fn is_head_sent(&self) -> bool {
        self.writer.is_head_sent()
    }

    /// Body bytes written so far.
    pub fn written(&self) -> u64 {
        self.writer.written()
    }

    /// Appends body bytes. They are buffered unless the configured write
    /// threshold is reached, in which case everything buffered is sent.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), SendError> {
        if self.writer.write(data)? {
            self.writer.flush(&mut **self.socket).await?;
        }
        Ok(())
    }

    /// Sends the head and every buffered byte now.
    ///
    /// Without an explicit `Content-Length`, flushing before the response is
    /// complete makes the body close-delimited: the connection is closed
    /// after this response.
    pub async fn flush(&mut self) -> Result<(), SendError> {
        self.writer.flush(&mut **self.socket).await
    }
}
