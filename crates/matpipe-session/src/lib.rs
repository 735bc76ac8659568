//! Drive an interactive numerical engine through its console.
//!
//! A [`Session`] starts the engine as a child process and talks to it the way
//! a person at the prompt would. Each exchange ends by asking the engine to
//! print a completion token, and the output is read up to that token. Arrays
//! travel through the engine's `load`/`save` pseudo-file on the same pipes,
//! encoded by a pluggable [`ArrayCodec`].

pub mod channel;
pub mod codec;
pub mod config;
pub mod detect;
pub mod error;
pub mod exchange;
pub mod names;
pub mod session;
pub mod value;
pub mod version;

pub use channel::{Channel, EvalOptions, SharedDetector};
pub use codec::{ArrayCodec, CodecUnavailable, Orientation, TextOnly};
pub use config::{SessionConfig, DEFAULT_CLOSE_TIMEOUT};
pub use detect::{ErrorDetector, MarkerDetector, DEFAULT_ERROR_MARKERS};
pub use error::{Result, SessionError};
pub use exchange::{GetOptions, GetRequest, GetResult, PutOptions};
pub use names::validate_name;
pub use session::Session;
pub use value::{normalize, Array, Value, Workspace};
pub use version::{InvalidVersion, VersionTag, DEFAULT_TRAILING_PADDING};
