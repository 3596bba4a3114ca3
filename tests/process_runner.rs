#![cfg(unix)]

mod common;

use std::{
    io::ErrorKind,
    time::{Duration, Instant},
};

use process_log_system::{OutputLine, Pipeline, ProcessRunner, RunError};

use common::{captured_logger, plain_config};

#[test]
fn two_stage_pipeline_filters_lines() {
    let pipeline = Pipeline::command(["printf", "a\nb\nc\n"]).stage(["grep", "b"]);
    let result = ProcessRunner::new().run(&pipeline).unwrap();

    assert_eq!(result.stdout, "b\n");
    assert_eq!(result.code, 0);
    assert!(result.success);
    assert!(result.stderr.is_empty());
}

#[test]
fn stderr_flood_does_not_deadlock() {
    let pipeline = Pipeline::command(["sh", "-c", "head -c 100000 /dev/zero | tr '\\0' x >&2"]);
    let started = Instant::now();
    let result = ProcessRunner::new().run(&pipeline).unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(result.success);
    assert!(result.stdout.is_empty());
    assert_eq!(result.stderr.len(), 100_000);
}

#[test]
fn large_output_on_both_streams_completes() {
    let script = "head -c 300000 /dev/zero | tr '\\0' e >&2; \
                  head -c 300000 /dev/zero | tr '\\0' o; \
                  echo; echo tail >&2";
    let result = ProcessRunner::new()
        .run(&Pipeline::command(["sh", "-c", script]))
        .unwrap();

    assert_eq!(result.stdout.len(), 300_001);
    assert_eq!(result.stderr.len(), 300_005);
    assert!(result.stderr.ends_with("tail\n"));
}

#[test]
fn empty_and_absent_arguments_never_reach_the_process() {
    let pipeline = Pipeline::command([
        Some("printf"),
        Some("[%s]"),
        Some(""),
        Some("a"),
        None,
        Some("b"),
    ]);
    let result = ProcessRunner::new().run(&pipeline).unwrap();
    assert_eq!(result.stdout, "[a][b]");
}

#[test]
fn line_callback_sees_every_line_in_stream_order() {
    let script = "for i in 1 2 3 4 5; do echo out$i; done; for i in 1 2 3; do echo err$i >&2; done";
    let result = ProcessRunner::new()
        .run_lines(&Pipeline::command(["sh", "-c", script]), |line| match line {
            OutputLine::Stdout(text) => format!("stdout:{}", text),
            OutputLine::Stderr(text) => format!("stderr:{}", text),
        })
        .unwrap();

    assert_eq!(result.line_outputs.len(), 8);
    let stdout: Vec<_> = result
        .line_outputs
        .iter()
        .filter_map(|entry| entry.strip_prefix("stdout:"))
        .collect();
    let stderr: Vec<_> = result
        .line_outputs
        .iter()
        .filter_map(|entry| entry.strip_prefix("stderr:"))
        .collect();
    assert_eq!(stdout, ["out1", "out2", "out3", "out4", "out5"]);
    assert_eq!(stderr, ["err1", "err2", "err3"]);
    assert!(result.completion_output.is_none());
}

#[test]
fn completion_callback_gets_full_streams_once() {
    let mut calls = 0;
    let result = ProcessRunner::new()
        .run_with(
            &Pipeline::command(["sh", "-c", "echo one; echo two; echo bad >&2"]),
            |line| line.stdout().is_some(),
            |stdout: &str, stderr: &str| {
                calls += 1;
                (stdout.to_string(), stderr.to_string())
            },
        )
        .unwrap();

    assert_eq!(calls, 1);
    assert_eq!(
        result.completion_output,
        Some(("one\ntwo\n".to_string(), "bad\n".to_string()))
    );
    assert_eq!(result.line_outputs.iter().filter(|is_stdout| **is_stdout).count(), 2);
}

#[test]
fn non_zero_exit_is_reported_not_raised() {
    let result = ProcessRunner::new()
        .run(&Pipeline::command(["sh", "-c", "echo oops >&2; exit 3"]))
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.code, 3);
    assert_eq!(result.stderr, "oops\n");

    match result.into_checked() {
        Err(RunError::Execution { code, stderr, .. }) => {
            assert_eq!(code, 3);
            assert_eq!(stderr, "oops\n");
        }
        other => panic!("expected execution failure, got {:?}", other),
    }
}

#[test]
fn only_last_stage_exit_code_counts() {
    let pipeline = Pipeline::command(["sh", "-c", "echo x; exit 4"]).stage(["cat"]);
    let result = ProcessRunner::new().run(&pipeline).unwrap();
    assert!(result.success);
    assert_eq!(result.stdout, "x\n");
}

#[test]
fn missing_executable_is_a_launch_error() {
    let err = ProcessRunner::new()
        .run(&Pipeline::command(["definitely-not-a-real-binary-7f3a"]))
        .unwrap_err();

    assert!(err.is_launch());
    match err {
        RunError::Launch { program, source } => {
            assert_eq!(program, "definitely-not-a-real-binary-7f3a");
            assert_eq!(source.kind(), ErrorKind::NotFound);
        }
        other => panic!("expected launch error, got {:?}", other),
    }
}

#[test]
fn launch_failure_later_in_pipeline_tears_down_earlier_stages() {
    let pipeline = Pipeline::command(["sleep", "5"]).stage(["definitely-not-a-real-binary-7f3a"]);
    let started = Instant::now();
    let err = ProcessRunner::new().run(&pipeline).unwrap_err();

    assert!(err.is_launch());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn runs_in_requested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let result = ProcessRunner::new()
        .run(&Pipeline::command(["pwd"]).cwd(dir.path()))
        .unwrap();

    let reported = std::fs::canonicalize(result.stdout.trim()).unwrap();
    assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
}

#[test]
fn show_output_relays_lines_to_the_logger() {
    let (logger, out) = captured_logger(plain_config());
    logger.start().unwrap();

    let runner = ProcessRunner::with_logger(logger.clone());
    let pipeline = Pipeline::command(["sh", "-c", "echo hello; echo broken >&2"])
        .show_output(true)
        .title("greeting");
    runner.run(&pipeline).unwrap();

    let quiet = Pipeline::command(["echo", "silent"]).title("hushed");
    runner.run(&quiet).unwrap();
    logger.stop();

    let lines = out.lines();
    assert_eq!(lines[0], "INFO | Running: greeting");
    assert!(!lines.iter().any(|line| line.contains("hushed")));
    assert!(lines.contains(&"INFO | hello".to_string()));
    assert!(lines.contains(&"ERROR | broken".to_string()));
    assert!(!lines.iter().any(|line| line.contains("silent")));
}
