use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use matpipe_session::{SessionConfig, VersionTag};
use matpipe_stream::DEFAULT_CHUNK_SIZE;
use matpipe_transport::{ProcessConfig, DEFAULT_ENGINE_ARGS};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod doctor;
pub mod eval;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the engine, evaluate expressions, and print their output.
    Eval(EvalArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Check that the engine can be launched from this environment.
    Doctor(DoctorArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Eval(args) => eval::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Doctor(args) => doctor::run(args, format),
    }
}

/// How to launch and talk to the engine.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Engine executable (path or name on PATH).
    #[arg(long, env = "MATPIPE_ENGINE", default_value = "matlab")]
    pub engine: PathBuf,
    /// Engine release, e.g. 2013b or R2010a.
    #[arg(long, env = "MATPIPE_ENGINE_VERSION", default_value = "2013b")]
    pub engine_version: String,
    /// Argument passed to the engine (repeatable). Replaces the default
    /// headless flags when given.
    #[arg(long, value_name = "ARG", allow_hyphen_values = true)]
    pub engine_arg: Vec<String>,
    /// Read timeout per exchange (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub timeout: String,
    /// Bytes requested per read from the engine.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Do not treat error-looking output as a failure.
    #[arg(long)]
    pub no_detect_errors: bool,
}

impl EngineArgs {
    pub fn version_tag(&self) -> CliResult<VersionTag> {
        self.engine_version
            .parse()
            .map_err(|err| CliError::new(USAGE, format!("--engine-version: {err}")))
    }

    pub fn process_config(&self) -> ProcessConfig {
        let process = ProcessConfig::new(&self.engine);
        if self.engine_arg.is_empty() {
            process.args(DEFAULT_ENGINE_ARGS.iter().copied())
        } else {
            process.args(&self.engine_arg)
        }
    }

    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let mut config = SessionConfig::new(self.process_config());
        config.version = self.version_tag()?;
        config.sync.read_timeout = parse_duration(&self.timeout)?;
        config.sync.chunk_size = self.chunk_size;
        config.detect_errors = !self.no_detect_errors;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
    /// Expressions to evaluate, in order.
    pub expressions: Vec<String>,
    /// Read further expressions from a file, one per line.
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,
    /// Stream engine output to stdout while each expression runs.
    #[arg(long)]
    pub stream: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };
    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
