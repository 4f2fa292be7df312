use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel used by every numeric limit to mean "no limit".
pub const UNLIMITED: i64 = -1;

/// Argument allowance given to rules written as a bare description string.
const SHORT_RULE_ARGS: [&str; 1] = ["--help"];

/// Interpret a limit value: negative means unlimited.
pub fn limit(value: i64) -> Option<u64> {
    u64::try_from(value).ok()
}

/// Named security level a policy declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Strict whitelist with exact argument matching
    Aggressive,
    /// Whitelist with relaxed argument matching
    Medium,
    /// No whitelist, catastrophic patterns only
    Minimal,
    /// No filtering at all
    None,
    /// Free-form user policy loaded from a document
    Custom,
}

impl SecurityLevel {
    /// Levels that can be selected by name and have compiled-in defaults.
    pub const BUILTIN: [SecurityLevel; 4] = [
        SecurityLevel::Aggressive,
        SecurityLevel::Medium,
        SecurityLevel::Minimal,
        SecurityLevel::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Medium => "medium",
            Self::Minimal => "minimal",
            Self::None => "none",
            Self::Custom => "custom",
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom)
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aggressive" => Ok(Self::Aggressive),
            "medium" => Ok(Self::Medium),
            "minimal" => Ok(Self::Minimal),
            "none" => Ok(Self::None),
            "custom" => Ok(Self::Custom),
            _ => anyhow::bail!(
                "invalid security level '{}' (expected: aggressive, medium, minimal, none, custom)",
                s
            ),
        }
    }
}

/// Acceptance rule for one whitelisted command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRule {
    /// Human-readable description shown by `list_allowed_commands`
    #[serde(default)]
    pub description: String,

    /// Arguments accepted verbatim; empty means no arguments beyond file paths
    #[serde(default)]
    pub allowed_args: Vec<String>,

    /// Whether non-flag arguments are treated as file paths
    #[serde(default)]
    pub requires_file: bool,
}

impl CommandRule {
    pub fn new(description: impl Into<String>, allowed_args: &[&str]) -> Self {
        Self {
            description: description.into(),
            allowed_args: allowed_args.iter().map(|a| a.to_string()).collect(),
            requires_file: false,
        }
    }

    /// Mark the rule as taking trailing file arguments.
    pub fn with_file(mut self) -> Self {
        self.requires_file = true;
        self
    }
}

/// A rule as written in a policy document: either the full shape or a bare description.
#[derive(Deserialize)]
#[serde(untagged)]
enum RuleEntry {
    Short(String),
    Full(CommandRule),
}

impl From<RuleEntry> for CommandRule {
    fn from(entry: RuleEntry) -> Self {
        match entry {
            RuleEntry::Short(description) => CommandRule::new(description, &SHORT_RULE_ARGS),
            RuleEntry::Full(rule) => rule,
        }
    }
}

fn deserialize_rules<'de, D>(deserializer: D) -> Result<BTreeMap<String, CommandRule>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, RuleEntry>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, entry)| (name.trim().to_lowercase(), entry.into()))
        .collect())
}

/// String-level restrictions applied to file path arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRestriction {
    pub enabled: bool,

    /// Regex the whole path must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_path_length: Option<usize>,
}

impl PathRestriction {
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// How the child environment is derived from the server's environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum EnvironmentPolicy {
    /// Copy only the named variables
    Whitelist {
        #[serde(default)]
        allowed_vars: BTreeSet<String>,
    },
    /// Copy everything except the named variables
    Blacklist {
        #[serde(default)]
        blocked_vars: BTreeSet<String>,
    },
    /// Copy everything
    Passthrough,
}

impl EnvironmentPolicy {
    pub fn whitelist(vars: &[&str]) -> Self {
        Self::Whitelist {
            allowed_vars: vars.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn blacklist(vars: &[&str]) -> Self {
        Self::Blacklist {
            blocked_vars: vars.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Whitelist { .. } => "whitelist",
            Self::Blacklist { .. } => "blacklist",
            Self::Passthrough => "passthrough",
        }
    }
}

/// Numeric limits; every field uses [`UNLIMITED`] for "no limit"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub max_arguments: i64,
    pub max_command_length: i64,
    /// Milliseconds
    pub timeout_max: i64,
    /// Milliseconds
    pub timeout_default: i64,
}

impl Limits {
    pub fn unlimited() -> Self {
        Self {
            max_arguments: UNLIMITED,
            max_command_length: UNLIMITED,
            timeout_max: UNLIMITED,
            timeout_default: UNLIMITED,
        }
    }
}

/// Complete description of one security level.
///
/// Field names follow the policy document format, so a document deserializes
/// straight into this type. Every field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(rename = "validation_level")]
    pub level: SecurityLevel,

    pub description: String,

    /// Whitelist keyed by lower-cased command name; empty means no whitelist
    #[serde(rename = "allowed_commands", deserialize_with = "deserialize_rules")]
    pub command_rules: BTreeMap<String, CommandRule>,

    /// Regex sources matched against `command + " " + args.join(" ")`
    pub forbidden_patterns: Vec<String>,

    #[serde(rename = "file_path_restrictions")]
    pub path_restriction: PathRestriction,

    pub environment_policy: EnvironmentPolicy,

    pub limits: Limits,
}

impl PolicyConfig {
    pub fn has_whitelist(&self) -> bool {
        !self.command_rules.is_empty()
    }

    pub fn rule(&self, command: &str) -> Option<&CommandRule> {
        self.command_rules.get(command)
    }
}
