use std::time::Duration;

use matpipe_stream::{completion_marker, SyncConfig, COMMAND_END_TOKEN, DEFAULT_PROMPT};
use matpipe_transport::ProcessConfig;

use crate::codec::Orientation;
use crate::detect::DEFAULT_ERROR_MARKERS;
use crate::error::{Result, SessionError};
use crate::version::VersionTag;

/// Default time `close` waits for the engine to exit after end-of-input.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything a session needs to drive one engine process.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How to launch the engine.
    pub process: ProcessConfig,
    /// Read timeout and chunk size for marker reads.
    pub sync: SyncConfig,
    /// Release of the engine; selects the save trailing-byte quirk.
    pub version: VersionTag,
    /// The engine's interactive prompt. Default: `">> "`.
    pub prompt: String,
    /// Token printed at the end of every exchange.
    pub completion_token: String,
    /// Substrings that mark output as an engine error.
    pub error_markers: Vec<String>,
    /// Default for error detection in `eval`. Default: on.
    pub detect_errors: bool,
    /// Layout for one-dimensional arrays in `put`. Default: row.
    pub orientation: Orientation,
    /// Collapse zero-dimensional results of `get` to scalars. Default: on.
    pub extract_scalars: bool,
    /// Evaluate each requested name before saving it, so missing
    /// variables fail fast with an engine error. Default: on.
    pub pre_evaluate: bool,
    /// Stream `eval` and startup output to stdout. Default: on.
    pub stream_output: bool,
    /// How long `close` waits for the engine to exit.
    pub close_timeout: Duration,
}

impl SessionConfig {
    /// Default configuration for the given engine launch settings.
    pub fn new(process: ProcessConfig) -> Self {
        Self {
            process,
            ..Self::default()
        }
    }

    /// The byte sequence that ends every synchronized exchange.
    pub fn completion_marker(&self) -> Vec<u8> {
        completion_marker(&self.completion_token, &self.prompt)
    }

    /// Reject settings that would corrupt the console protocol.
    pub fn validate(&self) -> Result<()> {
        let token = &self.completion_token;
        if token.is_empty() {
            return Err(SessionError::Config("completion token is empty".to_string()));
        }
        if token.contains(['\'', '\n', '\r']) {
            return Err(SessionError::Config(format!(
                "completion token {token:?} must not contain quotes or line breaks"
            )));
        }
        if self.prompt.is_empty() {
            return Err(SessionError::Config("prompt is empty".to_string()));
        }
        if self.sync.chunk_size == 0 {
            return Err(SessionError::Config("read chunk size is zero".to_string()));
        }
        if self.sync.read_timeout.is_zero() {
            return Err(SessionError::Config("read timeout is zero".to_string()));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            process: ProcessConfig::default(),
            sync: SyncConfig::default(),
            version: VersionTag::default(),
            prompt: DEFAULT_PROMPT.to_string(),
            completion_token: COMMAND_END_TOKEN.to_string(),
            error_markers: DEFAULT_ERROR_MARKERS.iter().map(|m| (*m).to_string()).collect(),
            detect_errors: true,
            orientation: Orientation::Row,
            extract_scalars: true,
            pre_evaluate: true,
            stream_output: true,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_conventions() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.sync.read_timeout, Duration::from_secs(10));
        assert_eq!(cfg.sync.chunk_size, 65536);
        assert_eq!(cfg.orientation, Orientation::Row);
        assert!(cfg.extract_scalars && cfg.detect_errors && cfg.stream_output);
        assert_eq!(
            cfg.completion_marker(),
            b"___MATLAB_PIPE_COMMAND_ENDED___\n>> ".to_vec()
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_unprintable_tokens() {
        let cfg = SessionConfig {
            completion_token: "it's".to_string(),
            ..SessionConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(SessionError::Config(_))));

        let cfg = SessionConfig {
            completion_token: String::new(),
            ..SessionConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_sync_settings() {
        let mut cfg = SessionConfig::default();
        cfg.sync.chunk_size = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = SessionConfig::default();
        cfg.sync.read_timeout = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }
}
