use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::spawn::{SpawnRequest, Spawner};
use crate::boundary::BoundaryGuard;
use crate::error::TermgateError;
use crate::session::SessionState;
use crate::validation::{PolicyEngine, ValidationOutcome, ValidatorCache};

/// Per-request execution overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecOptions {
    /// Working directory, relative paths resolve against the session directory
    pub cwd: Option<String>,
    /// Requested timeout in milliseconds
    pub timeout: Option<u64>,
    /// Extra environment variables, applied after policy filtering
    pub env: Option<BTreeMap<String, String>>,
}

/// Render a finished command the way every caller sees it.
pub fn format_output(stdout: &str, stderr: &str, exit_code: i32) -> String {
    let mut output = String::new();
    if !stdout.is_empty() {
        output.push_str(&format!("STDOUT:\n{}\n", stdout));
    }
    if !stderr.is_empty() {
        output.push_str(&format!("STDERR:\n{}\n", stderr));
    }
    output.push_str(&format!("Exit Code: {}", exit_code));
    output.trim().to_string()
}

/// Turn an accepted outcome into a spawn request under the engine that validated it.
fn prepare(
    engine: &PolicyEngine,
    current: &Path,
    outcome: ValidationOutcome,
    options: ExecOptions,
) -> Result<SpawnRequest, TermgateError> {
    let Some(command_line) = outcome.command_line() else {
        let error = outcome.error().unwrap_or_default().to_string();
        warn!(error = %error, "command rejected");
        return Err(TermgateError::PolicyRejected(error));
    };

    let cwd = match &options.cwd {
        Some(dir) => current.join(dir),
        None => current.to_path_buf(),
    };
    let request = SpawnRequest {
        command_line,
        cwd,
        timeout_ms: engine.timeout(options.timeout),
        env: engine.build_environment(options.env.as_ref()),
    };

    info!(
        command = %request.command_line,
        cwd = %request.cwd.display(),
        timeout_ms = request.timeout_ms,
        level = %engine.level(),
        "executing command"
    );
    Ok(request)
}

fn or_null(value: Option<impl ToString>) -> String {
    value.map_or_else(|| "null".to_string(), |v| v.to_string())
}

/// Coordinates validation, spawning, and session bookkeeping
pub struct Executor {
    cache: ValidatorCache,
    guard: BoundaryGuard,
    session: SessionState,
    spawner: Arc<dyn Spawner>,
    change_process_dir: bool,
}

impl Executor {
    /// Create an executor whose session starts in the boundary root when possible
    pub fn new(cache: ValidatorCache, guard: BoundaryGuard, spawner: Arc<dyn Spawner>) -> Self {
        let fallback = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let session = SessionState::new(guard.initial_directory(&fallback));
        info!(
            session_id = %session.id,
            directory = %session.current_directory().display(),
            boundary = %guard.root().display(),
            escape = guard.escape_enabled(),
            "session started"
        );
        Self {
            cache,
            guard,
            session,
            spawner,
            change_process_dir: false,
        }
    }

    /// Also move the process working directory on `change_directory`
    pub fn with_process_chdir(mut self, enabled: bool) -> Self {
        self.change_process_dir = enabled;
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The engine for the current selection
    pub fn engine(&mut self) -> &PolicyEngine {
        self.cache.get()
    }

    /// Rebuild the engine, re-reading policy documents
    pub fn reload_policy(&mut self) -> &PolicyEngine {
        self.cache.recreate()
    }

    /// Validate without running anything
    pub fn check(&mut self, command: &str, args: &[String]) -> ValidationOutcome {
        self.cache.get().validate_command(command, args)
    }

    /// Validate and run a typed request
    pub async fn execute_command(
        &mut self,
        command: &str,
        args: &[String],
        options: ExecOptions,
    ) -> Result<String, TermgateError> {
        let engine = self.cache.get();
        let outcome = engine.validate_command(command, args);
        let request = prepare(engine, self.session.current_directory(), outcome, options)?;
        self.run(request).await
    }

    /// Validate and run raw tool input, checking its shape first
    pub async fn execute_json(
        &mut self,
        command: &Value,
        args: &Value,
        options: ExecOptions,
    ) -> Result<String, TermgateError> {
        let engine = self.cache.get();
        let outcome = engine.validate_json(command, args);
        let request = prepare(engine, self.session.current_directory(), outcome, options)?;
        self.run(request).await
    }

    async fn run(&mut self, request: SpawnRequest) -> Result<String, TermgateError> {
        let command_line = request.command_line.clone();
        match self.spawner.spawn(request).await {
            Ok(output) => {
                self.session.record_execution(&command_line, output.exit_code);
                info!(command = %command_line, exit_code = output.exit_code, "command finished");
                Ok(format_output(&output.stdout, &output.stderr, output.exit_code))
            }
            Err(e) => {
                self.session.record_execution(&command_line, 1);
                warn!(command = %command_line, error = %e, "command failed");
                Ok(format_output("", &format!("{:#}", e), 1))
            }
        }
    }

    /// Move the session to `path`, resolved against the current directory
    pub fn change_directory(&mut self, path: &str) -> Result<String, TermgateError> {
        let resolved = self.guard.resolve(self.session.current_directory(), path)?;
        if !resolved.is_dir() {
            return Err(TermgateError::DirectoryNotFound(resolved));
        }

        if self.change_process_dir {
            std::env::set_current_dir(&resolved).map_err(TermgateError::ChangeDirectory)?;
        }

        info!(
            session_id = %self.session.id,
            directory = %resolved.display(),
            "directory changed"
        );
        self.session.set_directory(&resolved);
        Ok(format!("Current directory changed to: {}", resolved.display()))
    }

    pub fn current_directory(&self) -> String {
        format!(
            "Current directory: {}",
            self.session.current_directory().display()
        )
    }

    /// Session, environment, and policy summary as `key: value` lines
    pub fn terminal_info(&mut self) -> String {
        let engine = self.cache.get();
        let env = engine.environment();
        let session = &self.session;
        let boundary = self.guard.root().display().to_string();

        let lines = [
            ("shell", or_null(env.get("SHELL"))),
            ("user", or_null(env.get("USER"))),
            ("home", or_null(env.get("HOME"))),
            ("platform", std::env::consts::OS.to_string()),
            ("currentDirectory", session.current_directory().display().to_string()),
            ("lastCommand", or_null(session.last_command_line.as_deref())),
            ("lastExitCode", or_null(session.last_exit_code)),
            ("securityMode", format!("{}_ENABLED", engine.level().as_str().to_uppercase())),
            ("validationLevel", engine.policy().level.to_string()),
            ("allowedCommands", engine.allowed_command_count().to_string()),
            ("sessionId", session.id.clone()),
            ("boundaryDir", boundary),
            ("boundaryEscape", self.guard.escape_enabled().to_string()),
        ];

        lines
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Human-readable description of what the active policy permits
    pub fn allowed_commands(&mut self) -> String {
        let engine = self.cache.get();
        let policy = engine.policy();
        let level = engine.level().as_str().to_uppercase();

        if !policy.has_whitelist() {
            return format!(
                "SECURITY: {} Mode\n\n{}\n\nAll commands are allowed in this validation level.\n\n\
                 Active restrictions:\n- Forbidden patterns: {}\n- File path restrictions: {}\n- Environment policy: {}",
                level,
                policy.description,
                policy.forbidden_patterns.len(),
                if policy.path_restriction.enabled { "Enabled" } else { "Disabled" },
                policy.environment_policy.mode(),
            );
        }

        let commands = policy
            .command_rules
            .iter()
            .map(|(name, rule)| format!("{}: {}", name, rule.description))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "SECURITY: {} Mode - Whitelisted Commands Only\n\n{}\n\nAllowed commands:\n{}\n\n\
             Note: All commands are validated against security patterns and argument restrictions.",
            level, policy.description, commands
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_output_sections() {
        assert_eq!(format_output("hi\n", "", 0), "STDOUT:\nhi\n\nExit Code: 0");
        assert_eq!(
            format_output("", "boom", 2),
            "STDERR:\nboom\nExit Code: 2"
        );
        assert_eq!(format_output("", "", 0), "Exit Code: 0");
    }

    #[test]
    fn or_null_prints_missing_values() {
        assert_eq!(or_null(None::<&str>), "null");
        assert_eq!(or_null(Some(3)), "3");
    }

    #[test]
    fn options_reject_unknown_fields() {
        let parsed: Result<ExecOptions, _> =
            serde_json::from_value(serde_json::json!({ "cwd": "/tmp", "shell": "zsh" }));
        assert!(parsed.is_err());

        let parsed: ExecOptions = serde_json::from_value(serde_json::json!({ "timeout": 5 })).unwrap();
        assert_eq!(parsed.timeout, Some(5));
        assert!(parsed.cwd.is_none());
    }
}
