use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::sync::Arc;

use matpipe_stream::{display_command, CommandWriter, MarkerReader, Sink};
use tracing::debug;

use crate::config::SessionConfig;
use crate::detect::{ErrorDetector, MarkerDetector};
use crate::error::{Result, SessionError};

/// Shared, swappable error predicate.
pub type SharedDetector = Arc<dyn ErrorDetector + Send + Sync>;

/// Per-call settings for [`Channel::eval`].
#[derive(Debug)]
pub struct EvalOptions<'a> {
    /// Fail with [`SessionError::Engine`] when the output looks like an error.
    pub detect_errors: bool,
    /// Pass the expression itself to the sink before running it.
    pub echo_expression: bool,
    /// Where output streams while the command runs.
    pub sink: Sink<'a>,
}

impl<'a> EvalOptions<'a> {
    /// Defaults taken from the session configuration.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            detect_errors: config.detect_errors,
            echo_expression: false,
            sink: Sink::stdout_if(config.stream_output),
        }
    }

    #[must_use]
    pub fn detect_errors(mut self, enabled: bool) -> Self {
        self.detect_errors = enabled;
        self
    }

    #[must_use]
    pub fn echo_expression(mut self, enabled: bool) -> Self {
        self.echo_expression = enabled;
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: Sink<'a>) -> Self {
        self.sink = sink;
        self
    }
}

impl Default for EvalOptions<'_> {
    fn default() -> Self {
        Self {
            detect_errors: true,
            echo_expression: false,
            sink: Sink::Silent,
        }
    }
}

/// The console protocol over one command stream and one output stream.
///
/// Exactly one exchange is in flight at a time; every method drains the
/// engine's reply through the completion marker before returning.
pub struct Channel<W, R> {
    pub(crate) writer: CommandWriter<W>,
    pub(crate) reader: MarkerReader<R>,
    pub(crate) config: SessionConfig,
    pub(crate) marker: Vec<u8>,
    detector: SharedDetector,
}

impl<W: Write, R: Read + AsRawFd> Channel<W, R> {
    /// Wrap the engine's streams. `output` must be non-blocking.
    pub fn new(input: W, output: R, config: &SessionConfig) -> Self {
        let detector: SharedDetector = Arc::new(MarkerDetector::new(config.error_markers.clone()));
        Self {
            writer: CommandWriter::new(input),
            reader: MarkerReader::with_config(output, config.sync.clone()),
            marker: config.completion_marker(),
            config: config.clone(),
            detector,
        }
    }

    /// Replace the error predicate used by `eval`.
    pub fn set_error_detector(&mut self, detector: SharedDetector) {
        self.detector = detector;
    }

    /// Ask the engine to print the completion token and read through it.
    ///
    /// Returns everything read, including the marker.
    pub fn sync_output(&mut self, sink: &mut Sink<'_>) -> Result<Vec<u8>> {
        self.writer
            .send_line(&display_command(&self.config.completion_token))?;
        let out = self.reader.read_until(&self.marker, sink.as_output())?;
        Ok(out)
    }

    /// Read through `marker` without writing anything first.
    pub fn read_until(&mut self, marker: &[u8], sink: &mut Sink<'_>) -> Result<Vec<u8>> {
        debug!(marker = %String::from_utf8_lossy(marker).escape_debug(), "waiting for marker");
        Ok(self.reader.read_until(marker, sink.as_output())?)
    }

    /// Run `expression` and return its console output, without the
    /// completion marker.
    pub fn eval(&mut self, expression: &str, mut options: EvalOptions<'_>) -> Result<String> {
        self.eval_inner(
            expression,
            options.detect_errors,
            options.echo_expression,
            &mut options.sink,
        )
    }

    pub(crate) fn eval_inner(
        &mut self,
        expression: &str,
        detect_errors: bool,
        echo_expression: bool,
        sink: &mut Sink<'_>,
    ) -> Result<String> {
        if echo_expression {
            sink.emit(expression.as_bytes());
            sink.emit(b"\n");
        }

        self.writer.send_line(expression)?;
        let raw = self.sync_output(sink)?;
        let output = String::from_utf8_lossy(&raw).into_owned();

        if detect_errors && self.detector.is_error(&output) {
            debug!(expression, "engine output matched an error marker");
            return Err(SessionError::Engine { output });
        }

        let body = raw.len().saturating_sub(self.marker.len());
        Ok(String::from_utf8_lossy(&raw[..body]).into_owned())
    }

    /// Output already read but not yet consumed by an exchange.
    pub fn carry_over(&self) -> &[u8] {
        self.reader.carry_over()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
