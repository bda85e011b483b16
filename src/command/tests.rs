use super::*;
use std::time::Instant;
use tempfile::TempDir;

fn runner() -> SystemRunner {
    SystemRunner::new(Duration::from_secs(10))
}

#[test]
fn test_display_command_quotes_arguments() {
    assert_eq!(
        display_command("git", &["status", "--porcelain"]),
        "git status --porcelain"
    );

    // arguments with spaces survive a round trip through a shell
    let rendered = display_command("git", &["commit", "--message", "two words"]);
    assert_eq!(
        shlex::split(&rendered).unwrap(),
        vec!["git", "commit", "--message", "two words"]
    );
}

#[cfg(unix)]
#[test]
fn test_captures_stdout_and_exit_code() {
    let temp_dir = TempDir::new().unwrap();

    let output = runner()
        .run(temp_dir.path(), "sh", &["-c", "printf 'hello\\n'; echo oops >&2"])
        .unwrap();

    assert!(output.success());
    assert_eq!(output.stdout, "hello\n");
    assert_eq!(output.stderr, "oops\n");
}

#[cfg(unix)]
#[test]
fn test_runs_in_working_directory() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("marker.txt"), "").unwrap();

    let output = runner().run(temp_dir.path(), "ls", &[]).unwrap();

    assert!(output.stdout.contains("marker.txt"));
}

#[cfg(unix)]
#[test]
fn test_non_zero_exit_is_reported_not_raised() {
    let temp_dir = TempDir::new().unwrap();

    let output = runner().run(temp_dir.path(), "sh", &["-c", "exit 3"]).unwrap();

    assert!(!output.success());
    assert_eq!(output.code, Some(3));
}

#[cfg(unix)]
#[test]
fn test_large_output_does_not_block() {
    let temp_dir = TempDir::new().unwrap();

    // well beyond a typical 64k pipe buffer
    let output = runner()
        .run(
            temp_dir.path(),
            "sh",
            &["-c", "i=0; while [ $i -lt 20000 ]; do echo 0123456789; i=$((i+1)); done"],
        )
        .unwrap();

    assert!(output.success());
    assert_eq!(output.stdout.len(), 20_000 * 11);
}

#[test]
fn test_missing_program() {
    let temp_dir = TempDir::new().unwrap();

    let err = runner()
        .run(temp_dir.path(), "definitely-not-a-real-program-xyz", &[])
        .unwrap_err();

    assert!(matches!(err, CommandError::NotFound { ref program } if program == "definitely-not-a-real-program-xyz"));
}

#[cfg(unix)]
#[test]
fn test_timeout_kills_command() {
    let temp_dir = TempDir::new().unwrap();
    let runner = SystemRunner::new(Duration::from_millis(200));

    let started = Instant::now();
    let err = runner.run(temp_dir.path(), "sleep", &["5"]).unwrap_err();

    assert!(matches!(err, CommandError::Timeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(err.to_string().contains("sleep 5"));
}

#[cfg(unix)]
#[test]
fn test_timeout_covers_output_held_by_background_process() {
    let temp_dir = TempDir::new().unwrap();
    let runner = SystemRunner::new(Duration::from_millis(300));

    // the shell exits at once but `sleep` inherits and keeps its stdout open
    let started = Instant::now();
    let err = runner
        .run(temp_dir.path(), "sh", &["-c", "sleep 6 & echo hi"])
        .unwrap_err();

    assert!(matches!(err, CommandError::Timeout { .. }));
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "run blocked for {:?}",
        started.elapsed()
    );
}
