use std::path::PathBuf;

/// Errors that can occur while spawning or supervising the engine process.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The engine executable could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// The shared output pipe could not be created or configured.
    #[error("failed to set up output pipe: {0}")]
    Pipe(std::io::Error),

    /// An I/O error occurred on the process handle or its streams.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
