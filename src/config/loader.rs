use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};

use super::defaults;
use super::policy::{PolicyConfig, SecurityLevel};
use super::selector::Selection;

/// File suffixes recognized as policy documents.
pub const POLICY_SUFFIXES: [&str; 3] = ["yaml", "yml", "toml"];

/// Whether a value names a policy document by its suffix (case-insensitive).
pub fn has_policy_suffix(value: &str) -> bool {
    Path::new(value)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            POLICY_SUFFIXES
                .iter()
                .any(|suffix| ext.eq_ignore_ascii_case(suffix))
        })
}

/// Produces complete policies: compiled-in defaults, optionally overridden by
/// documents in a policy directory, or a custom document.
///
/// Loading never fails. A missing, unreadable, or invalid document is logged
/// and replaced by a compiled-in default.
#[derive(Debug, Clone, Default)]
pub struct PolicyLoader {
    policy_dir: Option<PathBuf>,
}

impl PolicyLoader {
    pub fn new(policy_dir: Option<PathBuf>) -> Self {
        Self { policy_dir }
    }

    /// Load the policy for a selector result.
    pub fn load(&self, selection: &Selection) -> PolicyConfig {
        match selection {
            Selection::Builtin(level) => self.builtin(*level),
            Selection::Custom(path) => self.custom(path),
        }
    }

    /// Policy for a built-in level, preferring `<policy_dir>/<level>.<suffix>`.
    pub fn builtin(&self, level: SecurityLevel) -> PolicyConfig {
        let Some(path) = self.override_path(level) else {
            debug!(%level, "no policy override found, using compiled-in defaults");
            return defaults::builtin(level);
        };

        match read_document(&path).and_then(|config| check(config, Some(level))) {
            Ok(config) => {
                info!(%level, path = %path.display(), "loaded policy override");
                config
            }
            Err(e) => {
                warn!(%level, path = %path.display(), error = %e, "invalid policy override, using compiled-in defaults");
                defaults::builtin(level)
            }
        }
    }

    /// Policy from an arbitrary document; falls back to the aggressive default.
    pub fn custom(&self, path: &Path) -> PolicyConfig {
        match read_document(path).and_then(|config| check(config, None)) {
            Ok(config) => {
                info!(path = %path.display(), level = %config.level, "loaded custom policy");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load custom policy, using aggressive defaults");
                defaults::builtin(SecurityLevel::Aggressive)
            }
        }
    }

    fn override_path(&self, level: SecurityLevel) -> Option<PathBuf> {
        let dir = self.policy_dir.as_ref()?;
        POLICY_SUFFIXES
            .iter()
            .map(|suffix| dir.join(format!("{}.{}", level, suffix)))
            .find(|path| path.is_file())
    }
}

/// Read and parse a policy document, choosing the format by suffix.
pub fn read_document(path: &Path) -> Result<PolicyConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read policy document {}", path.display()))?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(&content)
            .with_context(|| format!("failed to parse policy document {}", path.display()))
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse policy document {}", path.display()))
    }
}

/// Schema checks a parsed document must pass before it replaces a default.
fn check(config: PolicyConfig, expected: Option<SecurityLevel>) -> Result<PolicyConfig> {
    if let Some(expected) = expected {
        if config.level != expected {
            anyhow::bail!(
                "validation_level mismatch: expected {}, got {}",
                expected,
                config.level
            );
        }
    }

    if config.description.trim().is_empty() {
        anyhow::bail!("policy is missing a description");
    }

    for source in &config.forbidden_patterns {
        Regex::new(source).with_context(|| format!("invalid forbidden pattern: {}", source))?;
    }

    if let Some(source) = &config.path_restriction.pattern {
        Regex::new(source).with_context(|| format!("invalid file path pattern: {}", source))?;
    }

    Ok(config)
}
