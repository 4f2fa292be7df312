use async_trait::async_trait;
use serde_json::{Value, json};

use super::Tool;
use crate::error::TermgateError;
use crate::runtime::{ExecOptions, SharedExecutor};

fn invalid(tool_name: &str, message: impl Into<String>) -> TermgateError {
    TermgateError::InvalidParams {
        tool_name: tool_name.to_string(),
        message: message.into(),
    }
}

/// Run a validated command in the session directory
pub struct ExecuteCommandTool {
    executor: SharedExecutor,
}

impl ExecuteCommandTool {
    pub fn new(executor: SharedExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn name(&self) -> &str {
        "execute_command"
    }

    fn description(&self) -> &str {
        "Execute a terminal command. The command and its arguments are validated against the active security policy before anything runs."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The command to execute"
                },
                "args": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Command arguments",
                    "default": []
                },
                "options": {
                    "type": "object",
                    "properties": {
                        "cwd": {
                            "type": "string",
                            "description": "Working directory (defaults to the current directory)"
                        },
                        "timeout": {
                            "type": "integer",
                            "description": "Timeout in milliseconds, capped by the security level"
                        },
                        "env": {
                            "type": "object",
                            "additionalProperties": { "type": "string" },
                            "description": "Additional environment variables"
                        }
                    },
                    "additionalProperties": false
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String, TermgateError> {
        let command = params.get("command").unwrap_or(&Value::Null);
        let args = params.get("args").unwrap_or(&Value::Null);
        let options = match params.get("options") {
            None | Some(Value::Null) => ExecOptions::default(),
            Some(raw) => serde_json::from_value(raw.clone())
                .map_err(|e| invalid(self.name(), format!("invalid options: {}", e)))?,
        };

        let mut executor = self.executor.lock().await;
        executor.execute_json(command, args, options).await
    }
}

/// Move the session working directory within the boundary
pub struct ChangeDirectoryTool {
    executor: SharedExecutor,
}

impl ChangeDirectoryTool {
    pub fn new(executor: SharedExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for ChangeDirectoryTool {
    fn name(&self) -> &str {
        "change_directory"
    }

    fn description(&self) -> &str {
        "Change the working directory. Restricted to the boundary directory unless escape is enabled."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to change to, absolute or relative to the current directory"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String, TermgateError> {
        let path = params["path"]
            .as_str()
            .ok_or_else(|| invalid(self.name(), "missing 'path' parameter"))?;

        self.executor.lock().await.change_directory(path)
    }
}

pub struct GetCurrentDirectoryTool {
    executor: SharedExecutor,
}

impl GetCurrentDirectoryTool {
    pub fn new(executor: SharedExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for GetCurrentDirectoryTool {
    fn name(&self) -> &str {
        "get_current_directory"
    }

    fn description(&self) -> &str {
        "Get the current working directory path."
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value) -> Result<String, TermgateError> {
        Ok(self.executor.lock().await.current_directory())
    }
}

pub struct GetTerminalInfoTool {
    executor: SharedExecutor,
}

impl GetTerminalInfoTool {
    pub fn new(executor: SharedExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for GetTerminalInfoTool {
    fn name(&self) -> &str {
        "get_terminal_info"
    }

    fn description(&self) -> &str {
        "Get terminal environment info and security status."
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value) -> Result<String, TermgateError> {
        Ok(self.executor.lock().await.terminal_info())
    }
}

pub struct ListAllowedCommandsTool {
    executor: SharedExecutor,
}

impl ListAllowedCommandsTool {
    pub fn new(executor: SharedExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for ListAllowedCommandsTool {
    fn name(&self) -> &str {
        "list_allowed_commands"
    }

    fn description(&self) -> &str {
        "List the commands the active security level allows."
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value) -> Result<String, TermgateError> {
        Ok(self.executor.lock().await.allowed_commands())
    }
}
