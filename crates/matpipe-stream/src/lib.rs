//! Marker-delimited reads and command writes over the engine console.
//!
//! The engine has no request/response framing. This layer rebuilds message
//! boundaries on top of its text output:
//! - Commands are written as newline-terminated text
//! - Each exchange ends by asking the engine to print a sentinel token
//! - Reads accumulate output until that sentinel (plus prompt) shows up
//!
//! Output that arrives past a marker is kept for the next read, so no byte
//! is ever dropped or delivered twice.

pub mod error;
pub mod reader;
pub mod sink;
pub mod tokens;
pub mod writer;

pub use error::{Result, StreamError};
pub use reader::{MarkerReader, SyncConfig, DEFAULT_CHUNK_SIZE, DEFAULT_READ_TIMEOUT};
pub use sink::{OutputSink, Sink, StdoutSink};
pub use tokens::{
    completion_marker, display_command, load_command, save_command, BINARY_START,
    COMMAND_END_TOKEN, DEFAULT_PROMPT, LOAD_FINISHED, LOAD_READY, PSEUDO_FILE, SAVE_FORMAT,
};
pub use writer::CommandWriter;
