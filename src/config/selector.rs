use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::loader::has_policy_suffix;
use super::policy::SecurityLevel;

/// Which policy is active: a named built-in level or a custom document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    Builtin(SecurityLevel),
    Custom(PathBuf),
}

impl Selection {
    pub fn strictest() -> Self {
        Self::Builtin(SecurityLevel::Aggressive)
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin(level) => write!(f, "builtin:{}", level),
            Self::Custom(path) => write!(f, "custom:{}", path.display()),
        }
    }
}

/// Decides the active policy from a single selector value.
///
/// Relative document paths are tried against the installation root first and
/// the working directory second. Anything that cannot be resolved degrades to
/// the aggressive level.
#[derive(Debug, Clone)]
pub struct LevelSelector {
    install_root: Option<PathBuf>,
    working_dir: PathBuf,
}

impl LevelSelector {
    pub fn new(install_root: Option<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_root,
            working_dir: working_dir.into(),
        }
    }

    pub fn select(&self, input: Option<&str>) -> Selection {
        let Some(raw) = input.map(str::trim).filter(|v| !v.is_empty()) else {
            info!("no security level selected, defaulting to aggressive");
            return Selection::strictest();
        };

        if let Ok(level) = raw.parse::<SecurityLevel>() {
            if level.is_builtin() {
                match level {
                    SecurityLevel::None => {
                        warn!("security level 'none' selected: all command validation is disabled")
                    }
                    SecurityLevel::Minimal => {
                        warn!("security level 'minimal' selected: most protections are disabled")
                    }
                    _ => info!(%level, "using built-in security level"),
                }
                return Selection::Builtin(level);
            }
        }

        if has_policy_suffix(raw) {
            if let Some(path) = self.resolve_document(raw) {
                info!(path = %path.display(), "using custom policy document");
                return Selection::Custom(path);
            }
            warn!(value = raw, "policy document not found, defaulting to aggressive");
            return Selection::strictest();
        }

        warn!(value = raw, "unrecognized security level, defaulting to aggressive");
        Selection::strictest()
    }

    fn resolve_document(&self, raw: &str) -> Option<PathBuf> {
        let candidate = Path::new(raw);
        if candidate.is_absolute() {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }

        self.install_root
            .iter()
            .chain(std::iter::once(&self.working_dir))
            .map(|base| base.join(candidate))
            .inspect(|path| debug!(path = %path.display(), "probing policy document"))
            .find(|path| path.is_file())
    }
}
