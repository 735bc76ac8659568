use std::time::Duration;

use matpipe_stream::StreamError;
use matpipe_transport::TransportError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No engine process is running for this session.
    #[error("engine process is not active")]
    NotActive,

    /// `open` was called while a previous engine process is still running.
    #[error("engine process is still active; close it first")]
    AlreadyActive,

    /// The engine produced no output within the read timeout.
    #[error("timeout after {timeout:?} waiting for engine output")]
    Timeout { timeout: Duration, partial: String },

    /// The engine closed its output stream mid-exchange.
    #[error("engine closed its output stream")]
    Disconnected { partial: String },

    /// The engine's output looks like a computation error.
    #[error("engine reported an error:\n{output}")]
    Engine { output: String },

    /// The engine's reply did not have the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A variable name that cannot be safely placed in an engine command.
    #[error("invalid variable name '{0}'")]
    InvalidName(String),

    /// Session configuration rejected before any process was started.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Array encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Spawning or supervising the process failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Writing to or reading from the engine failed.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// True for the connection family: not running, already running,
    /// timed out, disconnected, or failed to spawn.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            SessionError::NotActive
                | SessionError::AlreadyActive
                | SessionError::Timeout { .. }
                | SessionError::Disconnected { .. }
                | SessionError::Transport(_)
        )
    }

    /// Raw engine output captured with the failure, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            SessionError::Engine { output } => Some(output),
            SessionError::Timeout { partial, .. } | SessionError::Disconnected { partial } => {
                Some(partial)
            }
            _ => None,
        }
    }

    pub(crate) fn codec<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SessionError::Codec(Box::new(err))
    }
}

impl From<StreamError> for SessionError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Timeout { timeout, partial } => SessionError::Timeout {
                timeout,
                partial: String::from_utf8_lossy(&partial).into_owned(),
            },
            StreamError::Closed { partial } => SessionError::Disconnected {
                partial: String::from_utf8_lossy(&partial).into_owned(),
            },
            StreamError::Io(err) => SessionError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_timeout_keeps_partial_text() {
        let err: SessionError = StreamError::Timeout {
            timeout: Duration::from_secs(10),
            partial: b"still computing".to_vec(),
        }
        .into();
        assert!(err.is_connection_error());
        assert_eq!(err.output(), Some("still computing"));
    }

    #[test]
    fn stream_closed_is_disconnect() {
        let err: SessionError = StreamError::Closed {
            partial: Vec::new(),
        }
        .into();
        assert!(matches!(err, SessionError::Disconnected { .. }));
        assert!(err.is_connection_error());
    }

    #[test]
    fn engine_error_is_not_connection_error() {
        let err = SessionError::Engine {
            output: "Undefined function 'x'".to_string(),
        };
        assert!(!err.is_connection_error());
        assert_eq!(err.output(), Some("Undefined function 'x'"));
        assert!(err.to_string().contains("Undefined function"));
    }
}
