//! End-to-end tests: real pipelines of standard Unix utilities.
//!
//! Output is always captured through a `>` redirection on the last stage,
//! since every stage otherwise writes to the test process's own stdout.

use std::fs;
use std::path::Path;

use tiny_pipeline_rs::config::{ArgOverflow, FailurePolicy, PipelineConfig};
use tiny_pipeline_rs::executor::{run_pipeline, StageStatus};
use tiny_pipeline_rs::tokenizer::tokenize;

fn run(line: &str) -> tiny_pipeline_rs::PipelineReport {
    run_pipeline(&tokenize(line), &PipelineConfig::default()).expect("pipeline should run")
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

// ============================================================================
// Wiring
// ============================================================================

#[test]
fn ls_piped_into_wc_counts_directory_entries() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a", "b", "c", "d"] {
        fs::write(dir.path().join(name), name).unwrap();
    }
    let out_dir = tempfile::tempdir().unwrap();
    let out = out_dir.path().join("count.txt");

    let report = run(&format!("ls {} | wc -l > {}", path_str(dir.path()), path_str(&out)));

    assert_eq!(report.process_count(), 2);
    assert_eq!(report.pipe_count, 1);
    assert!(report.success());
    let count: usize = fs::read_to_string(&out).unwrap().trim().parse().unwrap();
    assert_eq!(count, fs::read_dir(dir.path()).unwrap().count());
}

#[test]
fn piping_matches_going_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let direct = dir.path().join("direct.txt");
    let staged = dir.path().join("staged.txt");
    let through_file = dir.path().join("through_file.txt");

    run(&format!(r"printf b\na\nc\na\n | sort | uniq -c > {}", path_str(&direct)));
    run(&format!(r"printf b\na\nc\na\n | sort > {}", path_str(&staged)));
    run(&format!("uniq -c < {} > {}", path_str(&staged), path_str(&through_file)));

    let direct = fs::read(&direct).unwrap();
    assert!(!direct.is_empty());
    assert_eq!(direct, fs::read(&through_file).unwrap());
}

#[test]
fn long_pipeline_preserves_byte_order() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let report = run(&format!("seq 1 5000 | cat | cat | cat | tail -n 2 > {}", path_str(&out)));

    assert_eq!(report.process_count(), 5);
    assert_eq!(report.pipe_count, 4);
    assert_eq!(fs::read_to_string(&out).unwrap(), "4999\n5000\n");
}

#[test]
fn infinite_producer_does_not_hang() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let report = run(&format!("yes | head -n 3 > {}", path_str(&out)));

    assert_eq!(fs::read_to_string(&out).unwrap(), "y\ny\ny\n");
    assert!(report.stages[1].status.success());
    // `yes` ends on SIGPIPE once `head` is gone.
    assert_eq!(report.stages[0].status, StageStatus::Signaled(nix::sys::signal::Signal::SIGPIPE));
}

// ============================================================================
// Redirection
// ============================================================================

#[test]
fn cat_with_input_and_output_redirection() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    fs::write(&input, "line one\nline two\n").unwrap();

    let report = run(&format!("cat < {} > {}", path_str(&input), path_str(&output)));

    assert_eq!(report.process_count(), 1);
    assert_eq!(report.pipe_count, 0);
    assert_eq!(fs::read_to_string(&output).unwrap(), "line one\nline two\n");
}

#[test]
fn missing_input_file_leaves_output_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.txt");
    let output = dir.path().join("out.txt");

    let report = run(&format!("cat < {} > {}", path_str(&input), path_str(&output)));

    assert_eq!(report.stages[0].status, StageStatus::Exited(1));
    assert!(!output.exists());
}

#[test]
fn output_redirection_truncates_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.txt");
    fs::write(&output, "old contents that are longer\n").unwrap();

    run(&format!("echo new > {}", path_str(&output)));

    assert_eq!(fs::read_to_string(&output).unwrap(), "new\n");
}

#[test]
fn input_redirection_beats_pipe() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    fs::write(&input, "from the file\n").unwrap();

    let report = run(&format!(
        "echo from-the-pipe | cat < {} > {}",
        path_str(&input),
        path_str(&output)
    ));

    assert_eq!(report.process_count(), 2);
    assert_eq!(fs::read_to_string(&output).unwrap(), "from the file\n");
}

#[test]
fn output_redirection_beats_pipe() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");

    run(&format!("echo hello > {} | wc -c > {}", path_str(&first), path_str(&second)));

    assert_eq!(fs::read_to_string(&first).unwrap(), "hello\n");
    // The second stage read an empty pipe.
    assert_eq!(fs::read_to_string(&second).unwrap().trim(), "0");
}

#[test]
fn tokens_after_redirection_are_not_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.txt");
    let ignored = dir.path().join("ignored.txt");
    fs::write(&ignored, "stdin only\n").unwrap();

    run(&format!(
        "echo kept > {} dropped < {} also-dropped",
        path_str(&output),
        path_str(&ignored)
    ));

    assert_eq!(fs::read_to_string(&output).unwrap(), "kept\n");
}

// ============================================================================
// Stage-local failures
// ============================================================================

#[test]
fn missing_program_fails_only_its_stage() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.txt");

    let report = run(&format!("echo data | no-such-program-xyz | wc -l > {}", path_str(&output)));

    assert_eq!(report.process_count(), 3);
    assert_eq!(report.stages[1].status, StageStatus::Exited(127));
    assert!(report.stages[2].status.success());
    assert_eq!(fs::read_to_string(&output).unwrap().trim(), "0");
}

#[test]
fn non_executable_program_exits_126() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("not-executable.sh");
    fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();

    let report = run(path_str(&script));

    assert_eq!(report.stages[0].status, StageStatus::Exited(126));
}

#[test]
fn failure_policy_decides_the_exit_code() {
    let failing_first = run("false | true");
    let failing_last = run("true | false");

    assert_eq!(FailurePolicy::BestEffort.exit_code(&failing_last), 0);
    assert_eq!(FailurePolicy::LastStage.exit_code(&failing_first), 0);
    assert_eq!(FailurePolicy::LastStage.exit_code(&failing_last), 1);
    assert_eq!(FailurePolicy::AnyStage.exit_code(&failing_first), 1);
}

// ============================================================================
// Argument limit
// ============================================================================

#[test]
fn argument_cap_truncates_or_rejects() {
    let dir = tempfile::tempdir().unwrap();
    let truncated = dir.path().join("truncated.txt");
    let rejected = dir.path().join("rejected.txt");

    let config = PipelineConfig { max_args: Some(3), ..PipelineConfig::default() };
    let line = format!("echo a b c d > {}", path_str(&truncated));
    let report = run_pipeline(&tokenize(&line), &config).unwrap();
    assert!(report.success());
    assert_eq!(fs::read_to_string(&truncated).unwrap(), "a b\n");

    let config = PipelineConfig { arg_overflow: ArgOverflow::Reject, ..config };
    let line = format!("echo a b c d > {}", path_str(&rejected));
    let report = run_pipeline(&tokenize(&line), &config).unwrap();
    assert_eq!(report.stages[0].status, StageStatus::Exited(1));
    // Redirection happens before the stage reports its error.
    assert_eq!(fs::read_to_string(&rejected).unwrap(), "");
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Runs one command line through the binary so each stage's stderr can be
/// captured.
fn run_binary(line: &str, extra: &[&str]) -> std::process::Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_tiny-pipeline"))
        .args(extra)
        .args(["-c", line])
        .output()
        .expect("binary should start")
}

#[test]
fn missing_input_file_is_reported_with_os_reason() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.txt");

    let output = run_binary(&format!("cat < {}", path_str(&input)), &["--policy", "last-stage"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    let expected = format!("tiny-pipeline: open {}: No such file or directory", path_str(&input));
    assert!(stderr.contains(&expected), "stderr was: {stderr}");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn missing_program_is_reported_with_os_reason() {
    let output = run_binary("no-such-program-xyz", &["--policy", "last-stage"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("tiny-pipeline: exec no-such-program-xyz: No such file or directory"),
        "stderr was: {stderr}"
    );
    assert_eq!(output.status.code(), Some(127));
}

#[test]
fn default_policy_ignores_stage_failures() {
    let output = run_binary("false | no-such-program-xyz", &[]);

    assert_eq!(output.status.code(), Some(0));
}
