#![cfg(all(unix, feature = "cli"))]

use std::process::{Command, Output};

/// Console stand-in: banner, prompt, display commands, one failing name.
const SH_ENGINE: &str = r#"
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
    *) printf '>> ' ;;
  esac
done
"#;

fn matpipe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_matpipe"))
        .env_remove("MATPIPE_ENGINE")
        .env_remove("MATPIPE_ENGINE_VERSION")
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("matpipe should run")
}

fn eval_with_fake(extra: &[&str]) -> Output {
    let mut args = vec![
        "--format",
        "json",
        "eval",
        "--engine",
        "sh",
        "--engine-arg=-c",
        "--engine-arg",
        SH_ENGINE,
        "--timeout",
        "5s",
    ];
    args.extend_from_slice(extra);
    matpipe(&args)
}

#[test]
fn eval_prints_json_records() {
    let output = eval_with_fake(&["disp('ok')", "x = 1;"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "stdout: {stdout}");
    assert!(lines[0].contains("\"expression\":\"disp('ok')\""));
    assert!(lines[0].contains("\"status\":\"ok\""));
    assert!(lines[0].contains("\"output\":\"ok\""));
}

#[test]
fn engine_error_exits_40() {
    let output = eval_with_fake(&["undefined_name_xyz", "disp('ok')"]);
    assert_eq!(output.status.code(), Some(40));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 1, "evaluation stops at the error");
    assert!(stdout.contains("\"status\":\"error\""));
    assert!(stdout.contains("Undefined function"));
}

#[test]
fn detection_can_be_disabled_from_cli() {
    let output = eval_with_fake(&["--no-detect-errors", "undefined_name_xyz"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"status\":\"ok\""));
}

#[test]
fn stream_mode_echoes_as_it_runs() {
    let output = eval_with_fake(&["--stream", "disp('ok')"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("fake engine ready"));
    assert!(stdout.contains("disp('ok')\nok\n"));
}

#[test]
fn missing_engine_exits_3() {
    let output = matpipe(&["eval", "--engine", "/nonexistent/bin/matlab", "1+1"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("engine failed to start"));
}

#[test]
fn eval_without_expressions_is_usage_error() {
    let output = matpipe(&["eval", "--engine", "sh"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn bad_engine_version_is_usage_error() {
    let output = matpipe(&["eval", "--engine-version", "2013z", "1+1"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_prints_package_version() {
    let output = matpipe(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("matpipe {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn doctor_fails_for_missing_engine() {
    let output = matpipe(&[
        "--format",
        "json",
        "doctor",
        "--engine",
        "/nonexistent/bin/matlab",
    ]);
    assert_eq!(output.status.code(), Some(30));
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"overall\":\"fail\""));
}

#[test]
fn doctor_passes_with_shell_engine() {
    let output = matpipe(&["--format", "json", "doctor", "--engine", "sh"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"overall\":\"pass\""));
}
