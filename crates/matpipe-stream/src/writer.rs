use std::io::{ErrorKind, Write};

use tracing::trace;

use crate::error::{Result, StreamError};

/// Writes commands and raw payloads to the engine's command stream.
pub struct CommandWriter<T> {
    inner: T,
}

impl<T: Write> CommandWriter<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Send one command followed by a newline, then flush.
    pub fn send_line(&mut self, command: &str) -> Result<()> {
        trace!(command, "sending command");
        self.write_all(command.as_bytes())?;
        self.write_all(b"\n")?;
        self.flush()
    }

    /// Send raw bytes (a load payload) unmodified, then flush.
    pub fn send_bytes(&mut self, payload: &[u8]) -> Result<()> {
        trace!(bytes = payload.len(), "sending payload");
        self.write_all(payload)?;
        self.flush()
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < data.len() {
            match self.inner.write(&data[offset..]) {
                Ok(0) => return Err(StreamError::Closed { partial: Vec::new() }),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                    return Err(StreamError::Closed { partial: Vec::new() })
                }
                Err(err) => return Err(StreamError::Io(err)),
            }
        }
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                    return Err(StreamError::Closed { partial: Vec::new() })
                }
                Err(err) => return Err(StreamError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
