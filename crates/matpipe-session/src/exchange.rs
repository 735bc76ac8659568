//! Moving arrays across the console with the load/save pseudo-file.
//!
//! `load stdio` makes the engine read a data file from its own stdin, and
//! `save('stdio', ...)` makes it write one to stdout. Ack tokens printed
//! around the payload tell us where the binary bytes begin and end.

use std::io::{Read, Write};
use std::os::fd::AsRawFd;

use matpipe_stream::{load_command, save_command, Sink, BINARY_START, LOAD_FINISHED, LOAD_READY};
use tracing::debug;

use crate::channel::Channel;
use crate::codec::{ArrayCodec, Orientation};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::names::validate_name;
use crate::value::{normalize, Value, Workspace};

/// Which variables a `get` should fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetRequest {
    /// One variable; the result is its bare value.
    Name(String),
    /// Several variables; the result is always a workspace, even for one.
    Names(Vec<String>),
    /// The entire engine workspace.
    All,
}

impl GetRequest {
    fn names(&self) -> Option<Vec<String>> {
        match self {
            GetRequest::Name(name) => Some(vec![name.clone()]),
            GetRequest::Names(names) => Some(names.clone()),
            GetRequest::All => None,
        }
    }
}

impl From<&str> for GetRequest {
    fn from(name: &str) -> Self {
        GetRequest::Name(name.to_string())
    }
}

impl From<String> for GetRequest {
    fn from(name: String) -> Self {
        GetRequest::Name(name)
    }
}

impl From<Vec<String>> for GetRequest {
    fn from(names: Vec<String>) -> Self {
        GetRequest::Names(names)
    }
}

impl From<&[&str]> for GetRequest {
    fn from(names: &[&str]) -> Self {
        GetRequest::Names(names.iter().map(|n| (*n).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for GetRequest {
    fn from(names: [&str; N]) -> Self {
        GetRequest::Names(names.iter().map(|n| (*n).to_string()).collect())
    }
}

/// Result of a `get`: a bare value for [`GetRequest::Name`], otherwise a
/// workspace.
#[derive(Debug, Clone, PartialEq)]
pub enum GetResult {
    Value(Value),
    Workspace(Workspace),
}

impl GetResult {
    pub fn into_value(self) -> Option<Value> {
        match self {
            GetResult::Value(value) => Some(value),
            GetResult::Workspace(_) => None,
        }
    }

    pub fn into_workspace(self) -> Option<Workspace> {
        match self {
            GetResult::Workspace(ws) => Some(ws),
            GetResult::Value(_) => None,
        }
    }
}

/// Per-call settings for `put`.
#[derive(Debug, Default)]
pub struct PutOptions<'a> {
    pub orientation: Orientation,
    pub sink: Sink<'a>,
}

impl PutOptions<'_> {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            orientation: config.orientation,
            sink: Sink::Silent,
        }
    }
}

/// Per-call settings for `get`.
#[derive(Debug)]
pub struct GetOptions<'a> {
    /// Collapse zero-dimensional arrays to [`Value::Scalar`].
    pub extract_scalars: bool,
    /// Evaluate each name first so a missing variable fails as an engine
    /// error rather than as a broken save.
    pub pre_evaluate: bool,
    pub sink: Sink<'a>,
}

impl GetOptions<'_> {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            extract_scalars: config.extract_scalars,
            pre_evaluate: config.pre_evaluate,
            sink: Sink::Silent,
        }
    }
}

impl Default for GetOptions<'_> {
    fn default() -> Self {
        Self {
            extract_scalars: true,
            pre_evaluate: true,
            sink: Sink::Silent,
        }
    }
}

impl<W: Write, R: Read + AsRawFd> Channel<W, R> {
    /// Bind `vars` in the engine workspace.
    pub fn put<C>(&mut self, codec: &C, vars: &Workspace, mut options: PutOptions<'_>) -> Result<()>
    where
        C: ArrayCodec + ?Sized,
    {
        for name in vars.keys() {
            validate_name(name)?;
        }
        let payload = codec
            .encode(vars, options.orientation)
            .map_err(SessionError::codec)?;
        debug!(vars = vars.len(), bytes = payload.len(), "put: requesting load");

        self.writer.send_line(&load_command())?;
        self.read_until(LOAD_READY, &mut options.sink)?;

        self.writer.send_bytes(&payload)?;
        self.read_until(LOAD_FINISHED, &mut options.sink)?;

        self.sync_output(&mut options.sink)?;
        debug!("put: load finished");
        Ok(())
    }

    /// Fetch variables from the engine workspace.
    pub fn get<C>(
        &mut self,
        codec: &C,
        request: &GetRequest,
        mut options: GetOptions<'_>,
    ) -> Result<GetResult>
    where
        C: ArrayCodec + ?Sized,
    {
        let names = request.names();
        if let Some(names) = &names {
            if names.is_empty() {
                return Ok(GetResult::Workspace(Workspace::new()));
            }
            for name in names {
                validate_name(name)?;
            }
            if options.pre_evaluate {
                let detect = self.config.detect_errors;
                for name in names {
                    self.eval_inner(&format!("{name};"), detect, false, &mut options.sink)?;
                }
            }
        }

        self.writer.send_line(&save_command(names.as_deref()))?;
        self.read_until(BINARY_START, &mut options.sink)?;
        let raw = self.sync_output(&mut options.sink)?;
        let payload = self.strip_save_trailer(&raw)?;
        debug!(bytes = payload.len(), "get: save output captured");

        let mut workspace: Workspace = codec
            .decode(payload)
            .map_err(SessionError::codec)?
            .into_iter()
            .map(|(name, value)| (name, normalize(value, options.extract_scalars)))
            .collect();

        match request {
            GetRequest::Name(name) => {
                let value = match workspace.remove(name) {
                    Some(value) => value,
                    None => workspace.into_values().next().ok_or_else(|| {
                        SessionError::Protocol(format!("engine returned no value for '{name}'"))
                    })?,
                };
                Ok(GetResult::Value(value))
            }
            _ => Ok(GetResult::Workspace(workspace)),
        }
    }

    /// Cut the prompt bytes and completion marker off raw save output.
    ///
    /// How many prompt bytes precede the marker depends on the engine
    /// release. They are checked so that a wrong count fails loudly instead
    /// of handing a shifted payload to the codec.
    fn strip_save_trailer<'b>(&self, raw: &'b [u8]) -> Result<&'b [u8]> {
        let padding = self.config.version.trailing_padding();
        let trailer = self.marker.len() + padding;
        if raw.len() < trailer {
            return Err(SessionError::Protocol(format!(
                "save output is {} bytes, shorter than its {trailer}-byte trailer",
                raw.len()
            )));
        }

        let (payload, rest) = raw.split_at(raw.len() - trailer);
        let prompt = self.config.prompt.as_bytes();
        let pad = &rest[..padding];
        if !pad
            .iter()
            .all(|b| prompt.contains(b) || *b == b'\n' || *b == b'\r')
        {
            return Err(SessionError::Protocol(format!(
                "unexpected bytes {:?} before completion marker; is engine version {} correct?",
                String::from_utf8_lossy(pad),
                self.config.version
            )));
        }
        Ok(payload)
    }
}
