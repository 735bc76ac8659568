use std::fmt;
use std::io;

use matpipe_session::SessionError;

pub const SUCCESS: i32 = 0;
pub const CONNECTION_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const ENGINE_ERROR: i32 = 40;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof => CONNECTION_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    if let SessionError::Io(source) = err {
        return io_error(context, source);
    }
    let code = match &err {
        SessionError::Timeout { .. } => TIMEOUT,
        SessionError::Engine { .. } => ENGINE_ERROR,
        SessionError::Protocol(_) | SessionError::Codec(_) => DATA_INVALID,
        SessionError::InvalidName(_) | SessionError::Config(_) => USAGE,
        _ if err.is_connection_error() => CONNECTION_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}
