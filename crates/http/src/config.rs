//! Server configuration.
//!
//! Every knob has a default, so `ServerConfig::default()` is a working
//! configuration. Use [`ServerConfig::builder`] to change any of them.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::codec::{DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_HEADER_NUM};
use crate::trace::{ServerTrace, TracingTrace};

const DEFAULT_READ_BUFFER_CAPACITY: usize = 8 * 1024;
const DEFAULT_MAX_SYNC_ACCEPTS: usize = 64;

#[derive(Clone)]
pub struct ServerConfig {
    backlog: u32,
    max_header_bytes: usize,
    max_headers: usize,
    read_buffer_capacity: usize,
    write_buffer_threshold: Option<usize>,
    max_sync_accepts: usize,
    nodelay: bool,
    runtime: Option<Handle>,
    trace: Arc<dyn ServerTrace>,
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder { config: ServerConfig::default() }
    }

    /// Listen backlog hint. The OS clamps it to its own maximum.
    pub fn backlog(&self) -> u32 {
        self.backlog
    }

    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    pub fn max_headers(&self) -> usize {
        self.max_headers
    }

    pub fn read_buffer_capacity(&self) -> usize {
        self.read_buffer_capacity
    }

    /// Buffered response bytes that trigger an automatic flush, `None` when
    /// the response buffer is unbounded.
    pub fn write_buffer_threshold(&self) -> Option<usize> {
        self.write_buffer_threshold
    }

    /// Consecutive accepts completing without suspension before the accept
    /// loop yields to the scheduler.
    pub fn max_sync_accepts(&self) -> usize {
        self.max_sync_accepts
    }

    pub fn nodelay(&self) -> bool {
        self.nodelay
    }

    /// The runtime connections are spawned on, `None` for the runtime the
    /// server is started from.
    pub fn runtime(&self) -> Option<&Handle> {
        self.runtime.as_ref()
    }

    pub fn trace(&self) -> &Arc<dyn ServerTrace> {
        &self.trace
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            backlog: u32::MAX,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_headers: DEFAULT_MAX_HEADER_NUM,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            write_buffer_threshold: None,
            max_sync_accepts: DEFAULT_MAX_SYNC_ACCEPTS,
            nodelay: true,
            runtime: None,
            trace: Arc::new(TracingTrace),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("backlog", &self.backlog)
            .field("max_header_bytes", &self.max_header_bytes)
            .field("max_headers", &self.max_headers)
            .field("read_buffer_capacity", &self.read_buffer_capacity)
            .field("write_buffer_threshold", &self.write_buffer_threshold)
            .field("max_sync_accepts", &self.max_sync_accepts)
            .field("nodelay", &self.nodelay)
            .field("runtime", &self.runtime.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.config.backlog = backlog;
        self
    }

    pub fn max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.config.max_header_bytes = max_header_bytes;
        self
    }

    pub fn max_headers(mut self, max_headers: usize) -> Self {
        self.config.max_headers = max_headers;
        self
    }

    pub fn read_buffer_capacity(mut self, read_buffer_capacity: usize) -> Self {
        self.config.read_buffer_capacity = read_buffer_capacity.max(1);
        self
    }

    /// Bound the response buffer: once `threshold` bytes are buffered the
    /// writer flushes them to the socket. Data is never dropped.
    pub fn write_buffer_threshold(mut self, threshold: Option<usize>) -> Self {
        self.config.write_buffer_threshold = threshold.map(|t| t.max(1));
        self
    }

    pub fn max_sync_accepts(mut self, max_sync_accepts: usize) -> Self {
        self.config.max_sync_accepts = max_sync_accepts.max(1);
        self
    }

    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.config.runtime = Some(runtime);
        self
    }

    pub fn trace(mut self, trace: impl ServerTrace + 'static) -> Self {
        self.config.trace = Arc::new(trace);
        self
    }

    pub fn shared_trace(mut self, trace: Arc<dyn ServerTrace>) -> Self {
        self.config.trace = trace;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::NoopTrace;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.backlog(), u32::MAX);
        assert_eq!(config.max_header_bytes(), 8 * 1024);
        assert_eq!(config.max_headers(), 64);
        assert_eq!(config.write_buffer_threshold(), None);
        assert!(config.nodelay());
        assert!(config.runtime().is_none());
    }

    #[test]
    fn builder_overrides() {
        let config = ServerConfig::builder()
            .backlog(16)
            .max_header_bytes(1024)
            .max_headers(8)
            .read_buffer_capacity(0)
            .write_buffer_threshold(Some(4096))
            .max_sync_accepts(0)
            .nodelay(false)
            .trace(NoopTrace)
            .build();

        assert_eq!(config.backlog(), 16);
        assert_eq!(config.max_header_bytes(), 1024);
        assert_eq!(config.max_headers(), 8);
        assert_eq!(config.read_buffer_capacity(), 1);
        assert_eq!(config.write_buffer_threshold(), Some(4096));
        assert_eq!(config.max_sync_accepts(), 1);
        assert!(!config.nodelay());
    }
}
