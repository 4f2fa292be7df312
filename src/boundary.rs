use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::TermgateError;

/// Where directory changes may lead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryConfig {
    /// Root directory that every working directory must stay inside
    pub root_directory: PathBuf,

    /// When set, the boundary is not enforced
    pub escape_enabled: bool,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            root_directory: PathBuf::from("/tmp"),
            escape_enabled: false,
        }
    }
}

/// Lexical normalization: resolves `.` and `..` without touching the filesystem.
///
/// `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Confines directory changes to a root directory
#[derive(Debug, Clone)]
pub struct BoundaryGuard {
    config: BoundaryConfig,
    root: PathBuf,
}

impl BoundaryGuard {
    pub fn new(config: BoundaryConfig) -> Self {
        let root = if config.root_directory.is_absolute() {
            normalize(&config.root_directory)
        } else {
            let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
            normalize(&base.join(&config.root_directory))
        };
        Self { config, root }
    }

    /// Normalized absolute root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn escape_enabled(&self) -> bool {
        self.config.escape_enabled
    }

    /// Resolve `requested` against `current` and check it against the boundary.
    pub fn resolve(&self, current: &Path, requested: &str) -> Result<PathBuf, TermgateError> {
        let resolved = normalize(&current.join(requested));

        if self.config.escape_enabled {
            debug!(path = %resolved.display(), "boundary escape enabled, skipping check");
            return Ok(resolved);
        }

        if !resolved.starts_with(&self.root) {
            warn!(
                path = %resolved.display(),
                boundary = %self.root.display(),
                "directory change outside boundary"
            );
            return Err(TermgateError::BoundaryViolation {
                path: resolved,
                boundary: self.root.clone(),
            });
        }

        Ok(resolved)
    }

    /// Starting directory for a session.
    ///
    /// The root when the boundary is enforced and the root exists, otherwise
    /// `fallback`.
    pub fn initial_directory(&self, fallback: &Path) -> PathBuf {
        if self.config.escape_enabled {
            return fallback.to_path_buf();
        }

        if self.root.is_dir() {
            self.root.clone()
        } else {
            warn!(
                boundary = %self.root.display(),
                "boundary directory does not exist, starting in process directory"
            );
            fallback.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(root: &str, escape: bool) -> BoundaryGuard {
        BoundaryGuard::new(BoundaryConfig {
            root_directory: PathBuf::from(root),
            escape_enabled: escape,
        })
    }

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(normalize(Path::new("/tmp/./a/../b")), PathBuf::from("/tmp/b"));
        assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("/tmp/a/")), PathBuf::from("/tmp/a"));
    }

    #[test]
    fn parent_of_root_is_rejected() {
        let err = guard("/tmp", false)
            .resolve(Path::new("/tmp"), "../etc")
            .unwrap_err();
        assert!(matches!(
            err,
            TermgateError::BoundaryViolation { ref path, .. } if path == Path::new("/etc")
        ));
        assert!(err.to_string().contains("outside the allowed boundary"));
    }

    #[test]
    fn descendants_are_accepted() {
        let g = guard("/tmp", false);
        assert_eq!(
            g.resolve(Path::new("/tmp"), "work/src").unwrap(),
            PathBuf::from("/tmp/work/src")
        );
        assert_eq!(
            g.resolve(Path::new("/tmp/work"), "..").unwrap(),
            PathBuf::from("/tmp")
        );
        assert_eq!(
            g.resolve(Path::new("/tmp/work"), "/tmp/other").unwrap(),
            PathBuf::from("/tmp/other")
        );
    }

    #[test]
    fn sibling_with_shared_prefix_is_rejected() {
        let g = guard("/tmp", false);
        assert!(g.resolve(Path::new("/tmp"), "/tmpfoo").is_err());
        assert!(g.resolve(Path::new("/tmp"), "../tmp2/x").is_err());
    }

    #[test]
    fn escape_allows_anything() {
        let g = guard("/tmp", true);
        assert_eq!(
            g.resolve(Path::new("/tmp"), "../etc").unwrap(),
            PathBuf::from("/etc")
        );
    }

    #[test]
    fn initial_directory_prefers_existing_root() {
        let dir = tempfile::TempDir::new().expect("create temp dir");
        let g = BoundaryGuard::new(BoundaryConfig {
            root_directory: dir.path().to_path_buf(),
            escape_enabled: false,
        });
        assert_eq!(g.initial_directory(Path::new("/")), normalize(dir.path()));

        let missing = guard("/definitely/not/here", false);
        assert_eq!(missing.initial_directory(Path::new("/")), PathBuf::from("/"));
    }
}
