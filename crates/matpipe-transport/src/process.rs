use std::ffi::OsString;
use std::fs::File;
use std::io::Read;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::time::Duration;

use tracing::{debug, info};
use wait_timeout::ChildExt;

use crate::error::{Result, TransportError};
use crate::fd::{cloexec_pipe, set_nonblocking};

/// Flags that keep the engine from starting its desktop and JVM subsystems.
pub const DEFAULT_ENGINE_ARGS: &[&str] = &["-nojvm", "-nodesktop"];


/// How to launch the engine executable.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Path (or bare name resolved through `PATH`) of the engine executable.
    pub program: PathBuf,
    /// Command-line arguments. Default: [`DEFAULT_ENGINE_ARGS`].
    pub args: Vec<OsString>,
    /// Working directory for the child, if different from ours.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables for the child.
    pub env: Vec<(OsString, OsString)>,
}

impl ProcessConfig {
    /// Configuration for `program` with the default headless flags.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: DEFAULT_ENGINE_ARGS.iter().map(OsString::from).collect(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    /// Replace the argument list.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::new("matlab")
    }
}

/// Read end of the engine's merged stdout/stderr pipe.
///
/// Always in non-blocking mode: reads return `WouldBlock` when nothing is
/// buffered. Pair with [`crate::poll_readable`] to wait for data.
pub struct EngineOutput {
    file: File,
}

impl Read for EngineOutput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl AsRawFd for EngineOutput {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl std::fmt::Debug for EngineOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineOutput")
            .field("fd", &self.file.as_raw_fd())
            .finish()
    }
}

/// A running engine child process.
///
/// The command stream and output stream are handed out once through
/// [`take_input`](Self::take_input) and [`take_output`](Self::take_output);
/// dropping the input signals end-of-input to the engine.
#[derive(Debug)]
pub struct EngineProcess {
    child: Child,
    program: PathBuf,
    output: Option<EngineOutput>,
}

impl EngineProcess {
    /// Spawn the engine described by `config`.
    ///
    /// stdin is piped; stdout and stderr share one pipe so error text stays
    /// in order with regular output.
    pub fn spawn(config: &ProcessConfig) -> Result<Self> {
        let (read_end, write_end) = cloexec_pipe().map_err(TransportError::Pipe)?;
        let stderr_end = write_end.try_clone().map_err(TransportError::Pipe)?;
        set_nonblocking(read_end.as_raw_fd()).map_err(TransportError::Pipe)?;

        // The Command owns our copies of the write end; it must be dropped
        // right after spawning or the output pipe never reports EOF.
        let child = {
            let mut cmd = Command::new(&config.program);
            cmd.args(&config.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::from(write_end))
                .stderr(Stdio::from(stderr_end));
            if let Some(dir) = &config.working_dir {
                cmd.current_dir(dir);
            }
            cmd.envs(config.env.iter().map(|(k, v)| (k, v)));
            cmd.spawn().map_err(|source| TransportError::Spawn {
                program: config.program.clone(),
                source,
            })?
        };

        info!(program = ?config.program, pid = child.id(), "spawned engine process");

        Ok(Self {
            child,
            program: config.program.clone(),
            output: Some(EngineOutput {
                file: File::from(read_end),
            }),
        })
    }

    /// Take ownership of the command stream.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_input(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    /// Take ownership of the merged output stream.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_output(&mut self) -> Option<EngineOutput> {
        self.output.take()
    }

    /// OS process id.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// The executable this process was started from.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check if the process has exited without blocking.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// True while the process has not exited.
    pub fn is_running(&mut self) -> Result<bool> {
        Ok(self.try_wait()?.is_none())
    }

    /// Wait up to `timeout` for the process to exit on its own.
    ///
    /// Returns `Ok(None)` if it is still running when the bound elapses.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
        let status = self
            .child
            .wait_timeout(timeout)
            .map_err(TransportError::Io)?;
        if let Some(status) = status {
            debug!(pid = self.id(), %status, "engine process exited");
        }
        Ok(status)
    }

    /// Forcefully kill the process and reap it.
    pub fn kill(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.try_wait()? {
            return Ok(status);
        }
        self.child.kill()?;
        let status = self.child.wait()?;
        info!(pid = self.id(), %status, "killed engine process");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{ErrorKind, Write};

    fn sh(script: &str) -> ProcessConfig {
        ProcessConfig::new("sh").args(["-c", script])
    }

    fn read_to_eof(output: &mut EngineOutput) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            assert!(
                crate::poll_readable(output.as_raw_fd(), Duration::from_secs(5)).unwrap(),
                "engine output stalled"
            );
            match output.read(&mut buf) {
                Ok(0) => return out,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => panic!("read failed: {err}"),
            }
        }
    }

    #[test]
    fn default_config_is_headless() {
        let cfg = ProcessConfig::default();
        assert_eq!(cfg.program, PathBuf::from("matlab"));
        assert_eq!(cfg.args, vec![OsString::from("-nojvm"), OsString::from("-nodesktop")]);
    }

    #[test]
    fn stdout_and_stderr_share_one_stream() {
        let mut process = EngineProcess::spawn(&sh("echo out; echo err 1>&2")).unwrap();
        let mut output = process.take_output().unwrap();
        drop(process.take_input());

        let text = String::from_utf8(read_to_eof(&mut output)).unwrap();
        assert!(text.contains("out\n"));
        assert!(text.contains("err\n"));
        assert!(process.wait_timeout(Duration::from_secs(5)).unwrap().is_some());
    }

    #[test]
    fn closing_input_lets_engine_exit() {
        let mut process = EngineProcess::spawn(&sh("cat")).unwrap();
        let mut output = process.take_output().unwrap();
        let mut input = process.take_input().unwrap();
        assert!(process.is_running().unwrap());

        input.write_all(b"echoed\n").unwrap();
        drop(input);

        assert_eq!(read_to_eof(&mut output), b"echoed\n");
        let status = process.wait_timeout(Duration::from_secs(5)).unwrap();
        assert!(status.is_some_and(|s| s.success()));
        assert!(!process.is_running().unwrap());
    }

    #[test]
    fn output_starts_nonblocking() {
        let mut process = EngineProcess::spawn(&sh("sleep 5")).unwrap();
        let mut output = process.take_output().unwrap();

        let mut buf = [0u8; 8];
        let err = output.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);

        process.kill().unwrap();
        assert!(!process.is_running().unwrap());
    }

    #[test]
    fn streams_can_only_be_taken_once() {
        let mut process = EngineProcess::spawn(&sh("exit 0")).unwrap();
        assert!(process.take_input().is_some());
        assert!(process.take_input().is_none());
        assert!(process.take_output().is_some());
        assert!(process.take_output().is_none());
        let _ = process.wait_timeout(Duration::from_secs(5));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let result = EngineProcess::spawn(&ProcessConfig::new("/nonexistent/engine-binary"));
        assert!(matches!(result, Err(TransportError::Spawn { .. })));
    }

    #[test]
    fn wait_timeout_reports_still_running() {
        let mut process = EngineProcess::spawn(&sh("sleep 5")).unwrap();
        let status = process.wait_timeout(Duration::from_millis(30)).unwrap();
        assert!(status.is_none());
        process.kill().unwrap();
    }
}
