mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{MockSpawner, executor_with_input, output, test_executor};
use tempfile::TempDir;
use termgate::{ExecOptions, TermgateError};

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_accepted_command_runs_and_is_recorded() {
    let root = TempDir::new().expect("create temp dir");
    let spawner = Arc::new(MockSpawner::with_script(vec![output("total 0\n", "", 0)]));
    let mut executor = test_executor("aggressive", root.path(), None, spawner.clone());

    let text = executor
        .execute_command("ls", &args(&["-la"]), ExecOptions::default())
        .await
        .expect("ls -la is allowed");
    assert_eq!(text, "STDOUT:\ntotal 0\n\nExit Code: 0");

    let requests = spawner.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].command_line, "ls -la");
    assert_eq!(requests[0].cwd, root.path());
    assert_eq!(requests[0].timeout_ms, 10_000);

    let session = executor.session();
    assert_eq!(session.last_command_line.as_deref(), Some("ls -la"));
    assert_eq!(session.last_exit_code, Some(0));
}

#[tokio::test]
async fn test_rejected_command_has_no_side_effects() {
    let root = TempDir::new().expect("create temp dir");
    let spawner = Arc::new(MockSpawner::default());
    let mut executor = test_executor("aggressive", root.path(), None, spawner.clone());

    let err = executor
        .execute_command("rm", &args(&["-rf", "/"]), ExecOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TermgateError::PolicyRejected(_)));
    assert!(err.to_string().starts_with("security block: "));
    assert!(err.to_string().contains("forbidden pattern"));

    assert!(spawner.requests().is_empty());
    assert!(executor.session().last_command_line.is_none());
    assert!(executor.session().last_exit_code.is_none());
}

#[tokio::test]
async fn test_failing_command_reports_exit_code() {
    let root = TempDir::new().expect("create temp dir");
    let spawner = Arc::new(MockSpawner::with_script(vec![output(
        "",
        "cat: missing.txt: No such file or directory\n",
        1,
    )]));
    let mut executor = test_executor("medium", root.path(), None, spawner);

    let text = executor
        .execute_command("cat", &args(&["missing.txt"]), ExecOptions::default())
        .await
        .unwrap();
    assert_eq!(
        text,
        "STDERR:\ncat: missing.txt: No such file or directory\n\nExit Code: 1"
    );
    assert_eq!(executor.session().last_exit_code, Some(1));
}

#[tokio::test]
async fn test_spawn_failure_is_output_not_error() {
    let root = TempDir::new().expect("create temp dir");
    let spawner = Arc::new(MockSpawner::with_script(vec![Err(anyhow::anyhow!(
        "command timed out after 10000 ms"
    ))]));
    let mut executor = test_executor("aggressive", root.path(), None, spawner);

    let text = executor
        .execute_command("find", &args(&["-name"]), ExecOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "STDERR:\ncommand timed out after 10000 ms\nExit Code: 1");
    assert_eq!(executor.session().last_command_line.as_deref(), Some("find -name"));
    assert_eq!(executor.session().last_exit_code, Some(1));
}

#[tokio::test]
async fn test_exec_options_are_applied_through_policy() {
    let root = TempDir::new().expect("create temp dir");
    std::fs::create_dir(root.path().join("src")).unwrap();
    let spawner = Arc::new(MockSpawner::default());
    let mut executor = test_executor("aggressive", root.path(), None, spawner.clone());

    let options = ExecOptions {
        cwd: Some("src".to_string()),
        timeout: Some(60_000),
        env: Some(BTreeMap::from([("RUST_LOG".to_string(), "debug".to_string())])),
    };
    executor
        .execute_command("pwd", &[], options)
        .await
        .unwrap();

    let request = &spawner.requests()[0];
    assert_eq!(request.command_line, "pwd");
    assert_eq!(request.cwd, root.path().join("src"));
    assert_eq!(request.timeout_ms, 10_000, "clamped to the aggressive maximum");
    assert_eq!(request.env.get("RUST_LOG").map(String::as_str), Some("debug"));
    assert_eq!(request.env.get("HOME").map(String::as_str), Some("/home/agent"));
    assert!(!request.env.contains_key("API_KEY"));
}

#[tokio::test]
async fn test_none_level_passes_args_verbatim() {
    let root = TempDir::new().expect("create temp dir");
    let spawner = Arc::new(MockSpawner::default());
    let mut executor = test_executor("none", root.path(), None, spawner.clone());

    executor
        .execute_command("ls", &args(&["  -la  ", "", "pwd"]), ExecOptions::default())
        .await
        .unwrap();

    let request = &spawner.requests()[0];
    assert_eq!(request.command_line, "ls   -la    pwd");
    assert_eq!(request.timeout_ms, 0);
    assert!(request.env.contains_key("API_KEY"));
}

#[tokio::test]
async fn test_change_directory_stays_inside_boundary() {
    let root = TempDir::new().expect("create temp dir");
    std::fs::create_dir_all(root.path().join("project/src")).unwrap();
    let spawner = Arc::new(MockSpawner::default());
    let mut executor = test_executor("aggressive", root.path(), None, spawner.clone());

    assert_eq!(
        executor.current_directory(),
        format!("Current directory: {}", root.path().display())
    );

    let text = executor.change_directory("project/src").unwrap();
    let expected = root.path().join("project/src");
    assert_eq!(
        text,
        format!("Current directory changed to: {}", expected.display())
    );

    executor.change_directory("..").unwrap();
    assert_eq!(
        executor.session().current_directory(),
        root.path().join("project")
    );

    let err = executor.change_directory("../../..").unwrap_err();
    assert!(matches!(err, TermgateError::BoundaryViolation { .. }));
    assert_eq!(
        executor.session().current_directory(),
        root.path().join("project"),
        "failed change leaves the session untouched"
    );

    executor
        .execute_command("ls", &[], ExecOptions::default())
        .await
        .unwrap();
    assert_eq!(spawner.requests()[0].cwd, root.path().join("project"));
}

#[tokio::test]
async fn test_change_directory_requires_existing_directory() {
    let root = TempDir::new().expect("create temp dir");
    std::fs::write(root.path().join("notes.txt"), "hi").unwrap();
    let mut executor = test_executor("aggressive", root.path(), None, Arc::new(MockSpawner::default()));

    let err = executor.change_directory("nope").unwrap_err();
    assert!(matches!(err, TermgateError::DirectoryNotFound(_)));
    assert!(err.to_string().contains("does not exist"));

    let err = executor.change_directory("notes.txt").unwrap_err();
    assert!(matches!(err, TermgateError::DirectoryNotFound(_)));
}

#[tokio::test]
async fn test_terminal_info_reports_session_and_policy() {
    let root = TempDir::new().expect("create temp dir");
    let spawner = Arc::new(MockSpawner::default());
    let mut executor = test_executor("medium", root.path(), None, spawner);

    let info = executor.terminal_info();
    let lines: BTreeMap<&str, &str> = info
        .lines()
        .filter_map(|line| line.split_once(": "))
        .collect();

    assert_eq!(lines["shell"], "/bin/bash");
    assert_eq!(lines["user"], "agent");
    assert_eq!(lines["home"], "/home/agent");
    assert_eq!(lines["lastCommand"], "null");
    assert_eq!(lines["lastExitCode"], "null");
    assert_eq!(lines["securityMode"], "MEDIUM_ENABLED");
    assert_eq!(lines["validationLevel"], "medium");
    assert_eq!(lines["allowedCommands"], "32");
    assert_eq!(lines["boundaryEscape"], "false");
    assert_eq!(lines["sessionId"], executor.session().id);
    assert_eq!(info.lines().count(), 13);

    executor
        .execute_command("git", &args(&["status"]), ExecOptions::default())
        .await
        .unwrap();
    let info = executor.terminal_info();
    assert!(info.contains("lastCommand: git status"));
    assert!(info.contains("lastExitCode: 0"));
}

#[tokio::test]
async fn test_allowed_commands_listing() {
    let root = TempDir::new().expect("create temp dir");

    let mut strict = test_executor("aggressive", root.path(), None, Arc::new(MockSpawner::default()));
    let text = strict.allowed_commands();
    assert!(text.starts_with("SECURITY: AGGRESSIVE Mode - Whitelisted Commands Only"));
    assert!(text.contains("Allowed commands:\n"));
    assert!(text.contains("\nls: "));

    let mut open = test_executor("minimal", root.path(), None, Arc::new(MockSpawner::default()));
    let text = open.allowed_commands();
    assert!(text.starts_with("SECURITY: MINIMAL Mode\n"));
    assert!(text.contains("All commands are allowed"));
    assert!(text.contains("- File path restrictions: Disabled"));
    assert!(text.contains("- Environment policy: passthrough"));
}

#[tokio::test]
async fn test_request_uses_the_engine_that_validated_it() {
    let root = TempDir::new().expect("create temp dir");
    let lookups = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&lookups);
    // aggressive for the first lookup, none afterwards
    let input = Box::new(move || {
        let level = match counter.fetch_add(1, Ordering::SeqCst) {
            0 => "aggressive",
            _ => "none",
        };
        Some(level.to_string())
    });
    let spawner = Arc::new(MockSpawner::default());
    let mut executor = executor_with_input(input, root.path(), None, spawner.clone());

    executor
        .execute_command("ls", &args(&["-la"]), ExecOptions::default())
        .await
        .unwrap();
    assert_eq!(lookups.load(Ordering::SeqCst), 1);

    let request = &spawner.requests()[0];
    assert_eq!(request.timeout_ms, 10_000);
    assert!(!request.env.contains_key("API_KEY"));
}
