#![cfg(unix)]

use rustle_facts::process::{
    each_line, execute, CommandRunner, ExecutionError, ExecutionOptions, SystemRunner,
};
use std::time::{Duration, Instant};

#[test]
fn test_callback_can_stop_reading_early() {
    let mut seen = Vec::new();
    let result = each_line(
        "sh",
        &["-c", "echo first; echo second; echo third"],
        &ExecutionOptions::default().throw_on_failure(),
        |line| {
            seen.push(line.to_string());
            false
        },
    )
    .unwrap();

    assert!(result.success);
    assert_eq!(seen, vec!["first"]);
}

#[test]
fn test_timeout_kills_slow_command() {
    let started = Instant::now();
    let error = execute(
        "sleep",
        &["5"],
        &ExecutionOptions::default()
            .throw_on_failure()
            .with_timeout(Some(Duration::from_millis(200))),
    )
    .unwrap_err();

    assert!(matches!(error, ExecutionError::Timeout { .. }));
    assert!(!error.is_invocation_failure());
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn test_timeout_without_throw_is_unsuccessful() {
    let result = execute(
        "sleep",
        &["5"],
        &ExecutionOptions::default().with_timeout(Some(Duration::from_millis(100))),
    )
    .unwrap();

    assert!(!result.success);
    assert_eq!(result.exit_code, None);
}

#[test]
fn test_stderr_is_only_captured_when_merged() {
    let script = ["-c", "echo out; echo err 1>&2"];

    let separate = execute("sh", &script, &ExecutionOptions::default()).unwrap();
    assert_eq!(separate.output, "out");

    let merged = execute("sh", &script, &ExecutionOptions::default().merge_stderr()).unwrap();
    let mut lines: Vec<&str> = merged.output.lines().collect();
    lines.sort_unstable();
    assert_eq!(lines, vec!["err", "out"]);
}

#[test]
fn test_non_zero_exit() {
    let result = execute("sh", &["-c", "echo partial; exit 3"], &ExecutionOptions::default())
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.exit_code, Some(3));
    assert_eq!(result.output, "partial");

    let error = execute(
        "sh",
        &["-c", "echo oops 1>&2; exit 3"],
        &ExecutionOptions::default().throw_on_failure(),
    )
    .unwrap_err();
    match error {
        ExecutionError::Failed { code, stderr, .. } => {
            assert_eq!(code, Some(3));
            assert_eq!(stderr, "oops");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_children_run_in_the_c_locale() {
    let result = SystemRunner
        .execute(
            "sh",
            &["-c", "echo $LC_ALL $LANG"],
            &ExecutionOptions::default(),
        )
        .unwrap();
    assert_eq!(result.output, "C C");
}

#[test]
fn test_output_lines_are_trimmed_and_blank_lines_dropped() {
    let result = execute(
        "sh",
        &["-c", "printf '  padded  \\n\\n\\tlast\\n'"],
        &ExecutionOptions::default(),
    )
    .unwrap();
    assert_eq!(result.output, "padded\nlast");

    let untrimmed = ExecutionOptions {
        trim_output: false,
        ..ExecutionOptions::default()
    };
    let result = execute("sh", &["-c", "printf '  padded  \\n\\nlast\\n'"], &untrimmed).unwrap();
    assert_eq!(result.output, "  padded  \n\nlast");
}
