use std::time::Duration;

/// Errors that can occur while synchronizing on engine output.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// No output arrived within the read timeout.
    #[error("timeout after {timeout:?} waiting for engine output")]
    Timeout {
        timeout: Duration,
        /// Output consumed by the failed read before it gave up.
        partial: Vec<u8>,
    },

    /// The engine closed its end of the stream.
    #[error("engine stream closed")]
    Closed {
        /// Output consumed by the failed read before the stream closed.
        partial: Vec<u8>,
    },

    /// An I/O error occurred while reading or writing.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// Raw output captured before the failure, if any.
    pub fn partial_output(&self) -> &[u8] {
        match self {
            StreamError::Timeout { partial, .. } | StreamError::Closed { partial } => partial,
            StreamError::Io(_) => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
