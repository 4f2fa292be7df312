use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TermgateError {
    #[error("security block: {0}")]
    PolicyRejected(String),

    #[error("security block: path '{}' is outside the allowed boundary ({})", .path.display(), .boundary.display())]
    BoundaryViolation { path: PathBuf, boundary: PathBuf },

    #[error("security block: directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("invalid parameters for {tool_name}: {message}")]
    InvalidParams { tool_name: String, message: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to change directory: {0}")]
    ChangeDirectory(#[source] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
