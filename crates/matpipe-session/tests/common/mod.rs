#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;

use matpipe_session::{Array, ArrayCodec, Channel, Orientation, SessionConfig, Value, Workspace};
use matpipe_transport::ProcessConfig;

/// Length-prefixed JSON stand-in for the engine's binary container.
///
/// Scalars and vectors are widened to two dimensions on encode, the way the
/// engine stores them.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct JsonCodecError(pub String);

impl ArrayCodec for JsonCodec {
    type Error = JsonCodecError;

    fn encode(&self, vars: &Workspace, orientation: Orientation) -> Result<Vec<u8>, Self::Error> {
        let widened: Workspace = vars
            .iter()
            .map(|(name, value)| (name.clone(), widen(value, orientation)))
            .collect();
        let body = serde_json::to_vec(&widened).map_err(|e| JsonCodecError(e.to_string()))?;
        let mut out = (body.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Workspace, Self::Error> {
        let (len, body) = split_frame(bytes)?;
        if body.len() != len {
            return Err(JsonCodecError(format!(
                "frame says {len} bytes, got {}",
                body.len()
            )));
        }
        serde_json::from_slice(body).map_err(|e| JsonCodecError(e.to_string()))
    }
}

fn split_frame(bytes: &[u8]) -> Result<(usize, &[u8]), JsonCodecError> {
    if bytes.len() < 4 {
        return Err(JsonCodecError("frame shorter than its header".to_string()));
    }
    let (header, body) = bytes.split_at(4);
    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    Ok((len, body))
}

/// How the engine stores `value` once loaded with `orientation`.
pub fn widen(value: &Value, orientation: Orientation) -> Value {
    match value {
        Value::Scalar(x) => Value::Array(Array {
            shape: vec![1, 1],
            data: vec![*x],
        }),
        Value::Array(array) if array.ndim() == 1 => {
            let n = array.shape[0];
            let shape = match orientation {
                Orientation::Row => vec![1, n],
                Orientation::Column => vec![n, 1],
            };
            Value::Array(Array {
                shape,
                data: array.data.clone(),
            })
        }
        other => other.clone(),
    }
}

/// In-process engine that understands the console commands a channel sends.
struct FakeEngine {
    vars: Workspace,
    /// Prompt bytes written between save output and the next command.
    save_trailer: &'static str,
}

impl FakeEngine {
    fn reply<R: BufRead>(&mut self, line: &str, input: &mut R) -> Vec<u8> {
        let line = line.trim();
        if let Some(token) = line
            .strip_prefix("disp('")
            .and_then(|rest| rest.strip_suffix("');"))
        {
            return format!("{token}\n>> ").into_bytes();
        }
        if line == "load stdio;" {
            return self.load(input);
        }
        if let Some(args) = line
            .strip_prefix("save(")
            .and_then(|rest| rest.strip_suffix(");"))
        {
            return self.save(args);
        }
        if let Some(name) = line.strip_suffix(';') {
            if name.starts_with("sin(") {
                return b"Error using sin\nNot enough input arguments.\n>> ".to_vec();
            }
            if !self.vars.contains_key(name) {
                return format!("Undefined function or variable '{name}'.\n>> ").into_bytes();
            }
        }
        b">> ".to_vec()
    }

    fn load<R: BufRead>(&mut self, input: &mut R) -> Vec<u8> {
        let mut header = [0u8; 4];
        let mut out = Vec::new();
        if input.read_exact(&mut header).is_err() {
            return out;
        }
        let mut body = vec![0u8; u32::from_le_bytes(header) as usize];
        if input.read_exact(&mut body).is_err() {
            return out;
        }
        let mut frame = header.to_vec();
        frame.extend_from_slice(&body);
        if let Ok(vars) = JsonCodec.decode(&frame) {
            self.vars.extend(vars);
        }
        out.extend_from_slice(b"ack load finished\n>> ");
        out
    }

    fn save(&self, args: &str) -> Vec<u8> {
        let names: Vec<&str> = args
            .split(',')
            .map(|arg| arg.trim().trim_matches('\''))
            .filter(|arg| *arg != "stdio" && *arg != "-v6")
            .collect();
        let selected: Workspace = if names.is_empty() {
            self.vars.clone()
        } else {
            names
                .iter()
                .filter_map(|name| self.vars.get(*name).map(|v| (name.to_string(), v.clone())))
                .collect()
        };
        // Stored values are already widened; encode them as-is.
        let body = serde_json::to_vec(&selected).unwrap_or_default();
        let mut out = b"start_binary\n".to_vec();
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out.extend_from_slice(self.save_trailer.as_bytes());
        out
    }
}

/// A channel wired to an in-process fake engine.
///
/// `save_trailer` is what the engine prints after binary save output, e.g.
/// `">> "` for most releases.
pub fn fake_channel(
    config: &SessionConfig,
    save_trailer: &'static str,
) -> Channel<UnixStream, UnixStream> {
    let (cmd_host, cmd_engine) = UnixStream::pair().unwrap();
    let (out_engine, out_host) = UnixStream::pair().unwrap();
    out_host.set_nonblocking(true).unwrap();

    thread::spawn(move || {
        let mut engine = FakeEngine {
            vars: BTreeMap::new(),
            save_trailer,
        };
        let mut out = out_engine;
        let mut input = BufReader::new(cmd_engine);
        let mut line = String::new();
        loop {
            line.clear();
            match input.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            // Readiness goes out before the payload is read.
            if line.trim() == "load stdio;" && out.write_all(b"ack load stdio\n").is_err() {
                break;
            }
            let reply = engine.reply(&line, &mut input);
            if out.write_all(&reply).is_err() {
                break;
            }
        }
    });

    Channel::new(cmd_host, out_host, config)
}

pub fn test_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.sync.read_timeout = Duration::from_secs(2);
    config
}

/// POSIX shell stand-in for the engine console.
///
/// Prints a banner and prompt, echoes display commands, and reports an
/// undefined-variable error for `undefined_name_xyz`.
pub const SH_ENGINE: &str = r#"
printf 'fake engine ready\n>> '
while IFS= read -r line; do
  case "$line" in
    "disp('"*"');")
      tok=${line#"disp('"}
      tok=${tok%"');"}
      printf '%s\n>> ' "$tok"
      ;;
    "disp('ok')") printf 'ok\n>> ' ;;
    undefined_name_xyz) printf "Undefined function or variable 'undefined_name_xyz'.\n>> " ;;
    exit) exit 0 ;;
    *) printf '>> ' ;;
  esac
done
"#;

pub fn sh_engine_config() -> SessionConfig {
    let mut config = SessionConfig::new(ProcessConfig::new("sh").args(["-c", SH_ENGINE]));
    config.sync.read_timeout = Duration::from_secs(5);
    config.stream_output = false;
    config.close_timeout = Duration::from_secs(5);
    config
}
