use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::Tool;
use super::terminal::{
    ChangeDirectoryTool, ExecuteCommandTool, GetCurrentDirectoryTool, GetTerminalInfoTool,
    ListAllowedCommandsTool,
};
use crate::error::TermgateError;
use crate::runtime::SharedExecutor;

/// Registry for tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with the five terminal tools bound to one executor
    pub fn terminal(executor: SharedExecutor) -> Self {
        let mut registry = Self::new();
        registry.register(ExecuteCommandTool::new(executor.clone()));
        registry.register(ChangeDirectoryTool::new(executor.clone()));
        registry.register(GetCurrentDirectoryTool::new(executor.clone()));
        registry.register(GetTerminalInfoTool::new(executor.clone()));
        registry.register(ListAllowedCommandsTool::new(executor));
        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Get all tools, ordered by name
    pub fn all(&self) -> Vec<&dyn Tool> {
        let mut tools: Vec<&dyn Tool> = self.tools.values().map(|t| t.as_ref()).collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Dispatch a call by tool name
    pub async fn call(&self, name: &str, params: Value) -> Result<String, TermgateError> {
        let tool = self
            .get(name)
            .ok_or_else(|| TermgateError::UnknownTool(name.to_string()))?;
        debug!(tool = name, "dispatching tool call");
        tool.execute(params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
