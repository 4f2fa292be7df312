use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Per-process terminal session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Unique session identifier
    pub id: String,

    /// Working directory commands run in unless they name their own
    pub current_directory: PathBuf,

    /// Exit code of the most recent spawn attempt
    pub last_exit_code: Option<i32>,

    /// Command line of the most recent spawn attempt
    pub last_command_line: Option<String>,

    /// When the session was started
    pub started_at: DateTime<Utc>,

    /// When the session was last updated
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// Start a session in the given directory
    pub fn new(current_directory: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            current_directory: current_directory.into(),
            last_exit_code: None,
            last_command_line: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn current_directory(&self) -> &Path {
        &self.current_directory
    }

    /// Move the session to a new working directory
    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) {
        self.current_directory = directory.into();
        self.updated_at = Utc::now();
    }

    /// Record the result of a spawn attempt
    pub fn record_execution(&mut self, command_line: impl Into<String>, exit_code: i32) {
        self.last_command_line = Some(command_line.into());
        self.last_exit_code = Some(exit_code);
        self.updated_at = Utc::now();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(".")
    }
}
