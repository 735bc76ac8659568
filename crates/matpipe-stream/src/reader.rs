use std::io::{ErrorKind, Read};
use std::os::fd::AsRawFd;
use std::time::Duration;

use bytes::BytesMut;
use matpipe_transport::poll_readable;
use tracing::{debug, trace};

use crate::error::{Result, StreamError};
use crate::sink::OutputSink;

/// Default wait for new output before a read fails: 10 seconds.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default upper bound for a single read: 64 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Configuration for marker-synchronized reads.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long to wait for new bytes before failing. Default: 10 s.
    pub read_timeout: Duration,
    /// Maximum bytes requested per read. Default: 64 KiB.
    pub chunk_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Reads a non-blocking output stream up to sentinel markers.
///
/// Output read past a marker stays in an internal carry-over buffer and is
/// the first thing the next [`read_until`](Self::read_until) looks at.
pub struct MarkerReader<T> {
    inner: T,
    buf: BytesMut,
    scratch: Vec<u8>,
    config: SyncConfig,
}

impl<T: Read + AsRawFd> MarkerReader<T> {
    /// Create a marker reader with default configuration.
    ///
    /// `inner` should already be in non-blocking mode.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, SyncConfig::default())
    }

    /// Create a marker reader with explicit configuration.
    pub fn with_config(inner: T, config: SyncConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scratch: vec![0u8; config.chunk_size.max(1)],
            config,
        }
    }

    /// Read until `marker` has been seen, returning everything up to and
    /// including its first occurrence.
    ///
    /// While waiting, output that cannot be part of the marker is passed to
    /// `sink` as it arrives. The returned bytes always equal the
    /// concatenation of what the sink received during this call.
    pub fn read_until(
        &mut self,
        marker: &[u8],
        mut sink: Option<&mut dyn OutputSink>,
    ) -> Result<Vec<u8>> {
        let mut collected = Vec::new();
        if marker.is_empty() {
            return Ok(collected);
        }

        loop {
            if let Some(pos) = find(&self.buf, marker) {
                let chunk = self.buf.split_to(pos + marker.len());
                forward(&mut sink, &chunk, &mut collected);
                debug!(
                    bytes = collected.len(),
                    carry_over = self.buf.len(),
                    "marker reached"
                );
                return Ok(collected);
            }

            // The last `marker.len() - 1` bytes may be the front half of a
            // marker split across reads; everything before them is final.
            let keep = (marker.len() - 1).min(self.buf.len());
            let ready = self.buf.len() - keep;
            if ready > 0 {
                let chunk = self.buf.split_to(ready);
                forward(&mut sink, &chunk, &mut collected);
            }

            if let Err(err) = self.fill() {
                return Err(match err {
                    StreamError::Timeout { timeout, .. } => StreamError::Timeout {
                        timeout,
                        partial: collected,
                    },
                    StreamError::Closed { .. } => StreamError::Closed { partial: collected },
                    other => other,
                });
            }
        }
    }

    /// Block until at least one byte has been appended to the buffer.
    fn fill(&mut self) -> Result<()> {
        loop {
            if !poll_readable(self.inner.as_raw_fd(), self.config.read_timeout)? {
                return Err(StreamError::Timeout {
                    timeout: self.config.read_timeout,
                    partial: Vec::new(),
                });
            }

            match self.inner.read(&mut self.scratch) {
                Ok(0) => return Err(StreamError::Closed { partial: Vec::new() }),
                Ok(n) => {
                    trace!(bytes = n, "read engine output");
                    self.buf.extend_from_slice(&self.scratch[..n]);
                    return Ok(());
                }
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock
                        || err.kind() == ErrorKind::Interrupted =>
                {
                    continue;
                }
                Err(err) => return Err(StreamError::Io(err)),
            }
        }
    }

    /// Output already read but not yet consumed by a marker read.
    pub fn carry_over(&self) -> &[u8] {
        &self.buf
    }

    /// Remove and return the carry-over buffer.
    pub fn take_carry_over(&mut self) -> Vec<u8> {
        self.buf.split().to_vec()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    ///
    /// Any carry-over output is discarded.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Update the read timeout for subsequent reads.
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.config.read_timeout = timeout;
    }
}

fn forward(sink: &mut Option<&mut dyn OutputSink>, chunk: &[u8], collected: &mut Vec<u8>) {
    if let Some(sink) = sink.as_deref_mut() {
        sink.write_chunk(chunk);
    }
    collected.extend_from_slice(chunk);
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
