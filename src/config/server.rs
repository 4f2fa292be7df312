use std::path::{Path, PathBuf};

use crate::boundary::BoundaryConfig;

/// Environment variable selecting the security level or a policy document.
pub const SELECTOR_VAR: &str = "COMMAND_VALIDATION";
/// Environment variable naming the boundary directory.
pub const BOUNDARY_DIR_VAR: &str = "BOUNDARY_DIR";
/// Environment variable that disables the boundary when set to `true`.
pub const BOUNDARY_ESCAPE_VAR: &str = "BOUNDARY_ESCAPE";
/// Environment variable naming a directory of policy overrides.
pub const POLICY_DIR_VAR: &str = "TERMGATE_POLICY_DIR";

const DEFAULT_BOUNDARY_DIR: &str = "/tmp";

/// Conventional override directory, relative to the working directory.
const DEFAULT_POLICY_SUBDIR: &str = "config/validation";

/// Process-level settings, read once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Raw selector value (level name or policy document path)
    pub selector: Option<String>,

    pub boundary: BoundaryConfig,

    /// Directory holding `<level>.yaml` overrides of the built-in policies
    pub policy_dir: Option<PathBuf>,

    /// Base directory for resolving relative policy document paths
    pub install_root: Option<PathBuf>,
}

impl ServerConfig {
    /// Build from the process environment.
    pub fn from_env() -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut config = Self::from_lookup(|key| std::env::var(key).ok(), &working_dir);
        config.install_root = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        config
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, working_dir: &Path) -> Self {
        let boundary_dir = lookup(BOUNDARY_DIR_VAR)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BOUNDARY_DIR.to_string());

        let policy_dir = lookup(POLICY_DIR_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                let dir = working_dir.join(DEFAULT_POLICY_SUBDIR);
                dir.is_dir().then_some(dir)
            });

        Self {
            selector: lookup(SELECTOR_VAR),
            boundary: BoundaryConfig {
                root_directory: PathBuf::from(boundary_dir),
                escape_enabled: lookup(BOUNDARY_ESCAPE_VAR).as_deref() == Some("true"),
            },
            policy_dir,
            install_root: None,
        }
    }
}
