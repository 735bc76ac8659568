//! Engine lifecycle plus the console protocol, behind one handle.

use std::process::ChildStdin;
use std::time::Duration;

use matpipe_stream::Sink;
use matpipe_transport::{EngineOutput, EngineProcess};
use tracing::{debug, info, warn};

use crate::channel::{Channel, EvalOptions, SharedDetector};
use crate::codec::{ArrayCodec, TextOnly};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::exchange::{GetOptions, GetRequest, GetResult, PutOptions};
use crate::value::Workspace;
use crate::version::VersionTag;

type EngineChannel = Channel<ChildStdin, EngineOutput>;

/// How long a dropped session waits to reap an engine that exits on EOF.
const DROP_REAP_TIMEOUT: Duration = Duration::from_millis(250);

/// One engine process driven through its console.
///
/// A session is created closed. [`open`](Session::open) starts the engine and
/// waits for its first prompt; every other operation requires an open
/// session and fails with [`SessionError::NotActive`] otherwise.
pub struct Session<C = TextOnly> {
    config: SessionConfig,
    codec: C,
    process: Option<EngineProcess>,
    channel: Option<EngineChannel>,
    detector: Option<SharedDetector>,
}

impl Session<TextOnly> {
    /// A session that can evaluate commands but not exchange arrays.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_codec(config, TextOnly)
    }
}

impl<C: ArrayCodec> Session<C> {
    pub fn with_codec(config: SessionConfig, codec: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            codec,
            process: None,
            channel: None,
            detector: None,
        })
    }

    /// Start the engine, streaming its startup banner per `stream_output`.
    pub fn open(&mut self) -> Result<()> {
        let sink = Sink::stdout_if(self.config.stream_output);
        self.open_with(sink).map(|_| ())
    }

    /// Start the engine without printing anything; returns the banner.
    pub fn open_quiet(&mut self) -> Result<String> {
        self.open_with(Sink::Silent)
    }

    /// Start the engine and read through its first prompt.
    ///
    /// Returns the startup output, including the completion marker.
    pub fn open_with(&mut self, mut sink: Sink<'_>) -> Result<String> {
        if let Some(process) = self.process.as_mut() {
            if process.is_running()? {
                return Err(SessionError::AlreadyActive);
            }
            debug!(pid = process.id(), "previous engine has exited");
            self.channel = None;
            self.process = None;
        }

        let mut process = EngineProcess::spawn(&self.config.process)?;
        let (input, output) = match (process.take_input(), process.take_output()) {
            (Some(input), Some(output)) => (input, output),
            _ => {
                let _ = process.kill();
                return Err(SessionError::Protocol(
                    "engine process has no console streams".to_string(),
                ));
            }
        };

        let mut channel = Channel::new(input, output, &self.config);
        if let Some(detector) = &self.detector {
            channel.set_error_detector(detector.clone());
        }

        let banner = match channel.sync_output(&mut sink) {
            Ok(banner) => banner,
            Err(err) => {
                warn!(error = %err, "engine did not reach its prompt; killing it");
                drop(channel);
                let _ = process.kill();
                return Err(err);
            }
        };

        info!(pid = process.id(), version = %self.config.version, "engine session open");
        self.process = Some(process);
        self.channel = Some(channel);
        Ok(String::from_utf8_lossy(&banner).into_owned())
    }

    /// End input to the engine and wait for it to exit.
    ///
    /// Fails with [`SessionError::NotActive`] if the engine already exited or
    /// was already closed. If the engine outlives `close_timeout` the handle
    /// is kept, so a later `open` reports [`SessionError::AlreadyActive`]
    /// until it exits or is killed.
    pub fn close(&mut self) -> Result<()> {
        live_channel(&mut self.process, &mut self.channel)?;
        let Some(process) = self.process.as_mut() else {
            return Err(SessionError::NotActive);
        };
        // Dropping the channel closes the engine's stdin.
        self.channel = None;

        match process.wait_timeout(self.config.close_timeout)? {
            Some(status) => {
                info!(pid = process.id(), %status, "engine session closed");
                self.process = None;
            }
            None => {
                warn!(
                    pid = process.id(),
                    timeout = ?self.config.close_timeout,
                    "engine still running after end of input"
                );
            }
        }
        Ok(())
    }

    /// Forcibly terminate the engine.
    pub fn kill(&mut self) -> Result<()> {
        let Some(mut process) = self.process.take() else {
            return Err(SessionError::NotActive);
        };
        self.channel = None;
        let status = process.kill()?;
        debug!(pid = process.id(), %status, "engine session killed");
        Ok(())
    }

    /// True while the engine process is running and its console is attached.
    pub fn is_open(&mut self) -> bool {
        match (self.process.as_mut(), self.channel.as_ref()) {
            (Some(process), Some(_)) => process.is_running().unwrap_or(false),
            _ => false,
        }
    }

    /// Evaluate `expression` with the configured defaults.
    pub fn eval(&mut self, expression: &str) -> Result<String> {
        let options = EvalOptions::from_config(&self.config);
        self.eval_with(expression, options)
    }

    pub fn eval_with(&mut self, expression: &str, options: EvalOptions<'_>) -> Result<String> {
        live_channel(&mut self.process, &mut self.channel)?.eval(expression, options)
    }

    /// Bind every variable in `vars` in the engine workspace.
    pub fn put(&mut self, vars: &Workspace) -> Result<()> {
        let options = PutOptions::from_config(&self.config);
        self.put_with(vars, options)
    }

    pub fn put_with(&mut self, vars: &Workspace, options: PutOptions<'_>) -> Result<()> {
        live_channel(&mut self.process, &mut self.channel)?.put(&self.codec, vars, options)
    }

    /// Fetch variables from the engine workspace.
    pub fn get(&mut self, request: impl Into<GetRequest>) -> Result<GetResult> {
        let options = GetOptions::from_config(&self.config);
        self.get_with(request, options)
    }

    pub fn get_with(
        &mut self,
        request: impl Into<GetRequest>,
        options: GetOptions<'_>,
    ) -> Result<GetResult> {
        let request = request.into();
        live_channel(&mut self.process, &mut self.channel)?.get(&self.codec, &request, options)
    }

    /// Round-trip the completion token; returns whatever the engine printed
    /// before it, without the completion marker.
    pub fn sync_output(&mut self) -> Result<String> {
        let mut sink = Sink::Silent;
        let channel = live_channel(&mut self.process, &mut self.channel)?;
        let raw = channel.sync_output(&mut sink)?;
        let body = raw.len().saturating_sub(channel.marker.len());
        Ok(String::from_utf8_lossy(&raw[..body]).into_owned())
    }

    /// Replace the error predicate; survives reopening.
    pub fn set_error_detector(&mut self, detector: SharedDetector) {
        if let Some(channel) = self.channel.as_mut() {
            channel.set_error_detector(detector.clone());
        }
        self.detector = Some(detector);
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn version(&self) -> VersionTag {
        self.config.version
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Process id of the running engine, if any.
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(EngineProcess::id)
    }
}

/// The channel of a session whose engine is still alive.
fn live_channel<'a>(
    process: &mut Option<EngineProcess>,
    channel: &'a mut Option<EngineChannel>,
) -> Result<&'a mut EngineChannel> {
    let Some(running) = process.as_mut() else {
        return Err(SessionError::NotActive);
    };
    if let Some(status) = running.try_wait()? {
        debug!(pid = running.id(), %status, "engine exited between calls");
        *channel = None;
        *process = None;
        return Err(SessionError::NotActive);
    }
    channel.as_mut().ok_or(SessionError::NotActive)
}

/// Dropping closes the engine's stdin and briefly waits to reap it. An
/// engine that keeps running is left alone; call [`Session::close`] or
/// [`Session::kill`] to wait for or force its exit.
impl<C> Drop for Session<C> {
    fn drop(&mut self) {
        self.channel = None;
        if let Some(process) = self.process.as_mut() {
            if let Ok(None) = process.wait_timeout(DROP_REAP_TIMEOUT) {
                debug!(pid = process.id(), "session dropped with engine still running");
            }
        }
    }
}

impl<C> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("program", &self.config.process.program)
            .field("version", &self.config.version)
            .field("pid", &self.process.as_ref().map(EngineProcess::id))
            .finish()
    }
}
