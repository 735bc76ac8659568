use std::env;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: &'static str,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &'static str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name,
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let checks = vec![
        platform_check(),
        engine_path_check(&args.engine.engine),
        version_check(&args.engine.engine_version),
        temp_dir_check(),
        CheckResult::new(
            "engine_args",
            CheckStatus::Info,
            format!("{:?}", args.engine.process_config().args),
        ),
    ];

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let output = DoctorOutput {
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };
    print_doctor(&output, format);

    Ok(if has_fail { HEALTH_CHECK_FAILED } else { SUCCESS })
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("matpipe doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<16} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => println!("{}", output.overall),
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
    }
}

fn platform_check() -> CheckResult {
    if cfg!(unix) {
        CheckResult::new("platform", CheckStatus::Pass, "POSIX pipes and poll(2) available")
    } else {
        CheckResult::new(
            "platform",
            CheckStatus::Fail,
            "non-blocking engine pipes are only implemented for Unix",
        )
    }
}

fn engine_path_check(engine: &Path) -> CheckResult {
    let Some(path) = resolve_executable(engine) else {
        return CheckResult::new(
            "engine_path",
            CheckStatus::Fail,
            format!("{} not found", engine.display()),
        );
    };
    if is_executable(&path) {
        CheckResult::new("engine_path", CheckStatus::Pass, path.display().to_string())
    } else {
        CheckResult::new(
            "engine_path",
            CheckStatus::Fail,
            format!("{} is not executable", path.display()),
        )
    }
}

fn version_check(tag: &str) -> CheckResult {
    match tag.parse::<matpipe_session::VersionTag>() {
        Ok(version) => CheckResult::new(
            "engine_version",
            CheckStatus::Pass,
            format!(
                "{version} (save trailer {} bytes)",
                version.trailing_padding()
            ),
        ),
        Err(err) => CheckResult::new("engine_version", CheckStatus::Fail, err.to_string()),
    }
}

fn temp_dir_check() -> CheckResult {
    let path = env::temp_dir().join(format!("matpipe-doctor-{}", std::process::id()));
    match std::fs::write(&path, b"ok") {
        Ok(()) => {
            let _ = std::fs::remove_file(&path);
            CheckResult::new("temp_dir", CheckStatus::Pass, env::temp_dir().display().to_string())
        }
        Err(err) => CheckResult::new(
            "temp_dir",
            CheckStatus::Warn,
            format!("{} not writable: {err}", env::temp_dir().display()),
        ),
    }
}

/// Paths with a separator are taken as-is; bare names are looked up on PATH.
fn resolve_executable(engine: &Path) -> Option<PathBuf> {
    if engine.components().count() > 1 {
        return engine.exists().then(|| engine.to_path_buf());
    }
    let search = env::var_os("PATH")?;
    env::split_paths(&search)
        .map(|dir| dir.join(engine))
        .find(|candidate| candidate.is_file())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_is_found_on_path() {
        let check = engine_path_check(Path::new("sh"));
        assert_eq!(check.status, CheckStatus::Pass, "{}", check.detail);
    }

    #[test]
    fn missing_engine_fails() {
        let check = engine_path_check(Path::new("/nonexistent/bin/matlab"));
        assert_eq!(check.status, CheckStatus::Fail);
        assert!(check.detail.contains("not found"));
    }

    #[test]
    fn version_check_reports_quirk() {
        let check = version_check("2010a");
        assert_eq!(check.status, CheckStatus::Pass);
        assert!(check.detail.contains("6 bytes"));
        assert_eq!(version_check("2013q").status, CheckStatus::Fail);
    }

    #[test]
    fn doctor_output_has_overall_status() {
        let output = DoctorOutput {
            checks: vec![CheckResult::new("x", CheckStatus::Pass, "ok")],
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("doctor output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
    }
}
