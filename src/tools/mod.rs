mod registry;
mod terminal;

pub use registry::ToolRegistry;
pub use terminal::{
    ChangeDirectoryTool, ExecuteCommandTool, GetCurrentDirectoryTool, GetTerminalInfoTool,
    ListAllowedCommandsTool,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TermgateError;

/// An operation exposed to the calling agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool
    fn name(&self) -> &str;

    /// A description of what this tool does
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters
    fn schema(&self) -> Value;

    /// Execute the tool with the given parameters
    async fn execute(&self, params: Value) -> Result<String, TermgateError>;
}
