//! Child-process transport for driving an interactive engine over stdio.
//!
//! The engine is spawned with its GUI subsystems disabled, a piped command
//! stream, and a single output pipe shared by stdout and stderr. The output
//! end is non-blocking; readiness is awaited with [`poll_readable`].
//!
//! This is the lowest layer of matpipe. Everything else builds on top of
//! [`EngineProcess`] and [`EngineOutput`].

pub mod error;

#[cfg(unix)]
pub mod fd;
#[cfg(unix)]
pub mod process;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use fd::{poll_readable, set_nonblocking};
#[cfg(unix)]
pub use process::{EngineOutput, EngineProcess, ProcessConfig, DEFAULT_ENGINE_ARGS};
