use std::fs;
use std::path::Path;

use matpipe_session::{EvalOptions, Session, SessionError};
use matpipe_stream::Sink;
use tracing::debug;

use crate::cmd::EvalArgs;
use crate::exit::{io_error, session_error, CliError, CliResult, ENGINE_ERROR, SUCCESS, USAGE};
use crate::output::{print_eval, EvalRecord, EvalStatus, OutputFormat};

pub fn run(args: EvalArgs, format: OutputFormat) -> CliResult<i32> {
    let mut expressions = args.expressions.clone();
    if let Some(path) = &args.script {
        expressions.extend(read_script(path)?);
    }
    if expressions.is_empty() {
        return Err(CliError::new(
            USAGE,
            "nothing to evaluate: pass expressions or --script",
        ));
    }

    let mut config = args.engine.session_config()?;
    config.stream_output = args.stream;
    let prompt = config.prompt.clone();

    let mut session =
        Session::new(config).map_err(|err| session_error("invalid configuration", err))?;
    session
        .open()
        .map_err(|err| session_error("engine failed to start", err))?;

    let mut records = Vec::with_capacity(expressions.len());
    let mut failure = None;
    for expression in &expressions {
        let options = EvalOptions::from_config(session.config())
            .echo_expression(args.stream)
            .sink(Sink::stdout_if(args.stream));
        match session.eval_with(expression, options) {
            Ok(output) => records.push(EvalRecord {
                expression: expression.clone(),
                status: EvalStatus::Ok,
                output: display_text(&output, &prompt),
            }),
            Err(SessionError::Engine { output }) => {
                debug!(expression, "engine reported an error; stopping");
                records.push(EvalRecord {
                    expression: expression.clone(),
                    status: EvalStatus::Error,
                    output: display_text(&strip_marker(&output, session.config()), &prompt),
                });
                failure = Some(CliError::new(
                    ENGINE_ERROR,
                    format!("engine reported an error evaluating `{expression}`"),
                ));
                break;
            }
            Err(err) => {
                let _ = session.kill();
                return Err(session_error(&format!("eval `{expression}` failed"), err));
            }
        }
    }

    if !args.stream {
        print_eval(&records, format);
    }

    session
        .close()
        .map_err(|err| session_error("engine failed to shut down", err))?;

    match failure {
        Some(err) => Err(err),
        None => Ok(SUCCESS),
    }
}

/// Non-blank lines of `path`, skipping `%` comments.
fn read_script(path: &Path) -> CliResult<Vec<String>> {
    let text = fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('%'))
        .map(str::to_string)
        .collect())
}

fn strip_marker(output: &str, config: &matpipe_session::SessionConfig) -> String {
    let marker = String::from_utf8_lossy(&config.completion_marker()).into_owned();
    output.strip_suffix(&marker).unwrap_or(output).to_string()
}

/// Console output without its trailing prompt and blank lines.
fn display_text(output: &str, prompt: &str) -> String {
    let body = output.strip_suffix(prompt).unwrap_or(output);
    body.trim_end_matches(['\n', '\r']).to_string()
}
