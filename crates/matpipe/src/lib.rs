//! Drive an interactive numerical engine over stdio pipes.
//!
//! matpipe starts the engine as a child process, types commands into its
//! console, and reads the replies back. Completion is detected with a
//! sentinel token the engine is asked to print after each command. Arrays
//! are moved with the engine's own `load`/`save` pseudo-file, so no shared
//! files or engine-side extensions are needed.
//!
//! # Crate Structure
//!
//! - [`transport`]: spawning the engine and non-blocking pipe reads
//! - [`stream`]: reading the console up to a marker, writing commands
//! - [`session`]: evaluation, error detection, array exchange, lifecycle
//!
//! # Example
//!
//! ```no_run
//! use matpipe::{ProcessConfig, Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::new(ProcessConfig::new("matlab")))?;
//! session.open()?;
//! let out = session.eval("x = magic(3)")?;
//! println!("{out}");
//! session.close()?;
//! # Ok::<(), matpipe::SessionError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use matpipe_transport::*;
}

/// Re-export stream types.
pub mod stream {
    pub use matpipe_stream::*;
}

/// Re-export session types.
pub mod session {
    pub use matpipe_session::*;
}

pub use matpipe_session::{
    ArrayCodec, EvalOptions, GetOptions, GetRequest, GetResult, Orientation, PutOptions, Session,
    SessionConfig, SessionError, Value, VersionTag, Workspace,
};
pub use matpipe_stream::{OutputSink, Sink};
pub use matpipe_transport::ProcessConfig;
