use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{Duration, timeout};
use tracing::debug;

const SHELL: &str = "/bin/sh";
const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Everything needed to run one validated command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub command_line: String,
    pub cwd: PathBuf,
    /// Milliseconds; `0` means no timeout
    pub timeout_ms: u64,
    /// Complete child environment; nothing is inherited
    pub env: BTreeMap<String, String>,
}

/// Captured result of a finished child process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Runs command lines on behalf of the executor.
///
/// A non-zero exit is a successful spawn; `Err` means the process could not
/// be started or did not finish in time.
#[async_trait]
pub trait Spawner: Send + Sync {
    async fn spawn(&self, request: SpawnRequest) -> Result<SpawnOutput>;
}

/// Spawns `sh -c <command line>` with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSpawner;

#[async_trait]
impl Spawner for ProcessSpawner {
    async fn spawn(&self, request: SpawnRequest) -> Result<SpawnOutput> {
        let mut cmd = Command::new(SHELL);
        cmd.arg("-c").arg(&request.command_line);
        cmd.current_dir(&request.cwd);
        cmd.env_clear();
        cmd.envs(&request.env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        debug!(
            command = %request.command_line,
            cwd = %request.cwd.display(),
            timeout_ms = request.timeout_ms,
            "spawning"
        );

        let result = if request.timeout_ms == 0 {
            cmd.output().await
        } else {
            timeout(Duration::from_millis(request.timeout_ms), cmd.output())
                .await
                .with_context(|| format!("command timed out after {} ms", request.timeout_ms))?
        };
        let output =
            result.with_context(|| format!("failed to execute command: {}", request.command_line))?;

        Ok(SpawnOutput {
            stdout: capture(&output.stdout),
            stderr: capture(&output.stderr),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Lossy UTF-8 decode, truncated on a char boundary.
fn capture(bytes: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(bytes).into_owned();
    if text.len() > MAX_OUTPUT_BYTES {
        let mut end = MAX_OUTPUT_BYTES;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push_str("\n... [output truncated]");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(line: &str, timeout_ms: u64) -> SpawnRequest {
        SpawnRequest {
            command_line: line.to_string(),
            cwd: std::env::temp_dir(),
            timeout_ms,
            env: BTreeMap::from([("PATH".to_string(), "/usr/bin:/bin".to_string())]),
        }
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let output = ProcessSpawner.spawn(request("echo hello", 5_000)).await.unwrap();
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn non_zero_exit_is_not_an_error() {
        let output = ProcessSpawner
            .spawn(request("echo oops >&2; exit 3", 0))
            .await
            .unwrap();
        assert_eq!(output.stderr, "oops\n");
        assert_eq!(output.exit_code, 3);
    }

    #[tokio::test]
    async fn environment_is_not_inherited() {
        let mut req = request("echo \"[$HOME]\"", 5_000);
        req.env.insert("ONLY".to_string(), "me".to_string());
        let output = ProcessSpawner.spawn(req).await.unwrap();
        assert_eq!(output.stdout, "[]\n");
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let err = ProcessSpawner.spawn(request("sleep 5", 50)).await.unwrap_err();
        assert!(err.to_string().contains("timed out after 50 ms"));
    }

    #[test]
    fn capture_truncates_on_char_boundary() {
        let bytes = "é".repeat(MAX_OUTPUT_BYTES).into_bytes();
        let text = capture(&bytes);
        assert!(text.ends_with("[output truncated]"));
        assert!(text.len() < MAX_OUTPUT_BYTES + 32);
    }
}
