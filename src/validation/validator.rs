use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;

use super::environment::{EnvSnapshot, build_environment};
use super::outcome::ValidationOutcome;
use crate::config::{CommandRule, PolicyConfig, SecurityLevel, limit};
use crate::error::TermgateError;

/// Timeout used when a bounded policy leaves its default unlimited.
const FALLBACK_TIMEOUT_MS: u64 = 30_000;

/// Whitelist size up to which a pattern-bearing custom policy is treated as aggressive.
const SMALL_WHITELIST: usize = 30;

/// Whitelist size up to which a custom policy is treated as medium.
const MODERATE_WHITELIST: usize = 100;

/// Level whose rules a policy is enforced with.
///
/// Built-in levels enforce themselves. A `custom` policy is mapped by the
/// shape of its whitelist: small lists with forbidden patterns are strict,
/// moderate lists are medium, empty or very large lists are minimal.
pub fn enforced_level(config: &PolicyConfig) -> SecurityLevel {
    if config.level != SecurityLevel::Custom {
        return config.level;
    }

    let commands = config.command_rules.len();
    let has_patterns = !config.forbidden_patterns.is_empty();
    match commands {
        0 => SecurityLevel::Minimal,
        n if n <= SMALL_WHITELIST && has_patterns => SecurityLevel::Aggressive,
        n if n <= MODERATE_WHITELIST => SecurityLevel::Medium,
        _ => SecurityLevel::Minimal,
    }
}

/// A policy with its regular expressions compiled
#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    config: PolicyConfig,
    forbidden: Vec<(String, Regex)>,
    path_pattern: Option<Regex>,
}

impl CompiledPolicy {
    pub fn compile(config: PolicyConfig) -> Result<Self, TermgateError> {
        let forbidden = config
            .forbidden_patterns
            .iter()
            .map(|source| {
                Regex::new(source)
                    .map(|re| (source.clone(), re))
                    .map_err(|e| TermgateError::Config(format!("invalid forbidden pattern {}: {}", source, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Anchored so the whole path has to match, not just a substring.
        let path_pattern = config
            .path_restriction
            .pattern
            .as_ref()
            .map(|source| {
                Regex::new(&format!("^(?:{})$", source))
                    .map_err(|e| TermgateError::Config(format!("invalid file path pattern {}: {}", source, e)))
            })
            .transpose()?;

        Ok(Self {
            config,
            forbidden,
            path_pattern,
        })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Source of the first forbidden pattern matching the command line.
    fn forbidden_match(&self, line: &str) -> Option<&str> {
        self.forbidden
            .iter()
            .find(|(_, re)| re.is_match(line))
            .map(|(source, _)| source.as_str())
    }

    /// Emptiness, argument count, and length checks shared by every filtering level.
    fn check_input(&self, command: &str, args: &[String]) -> Option<String> {
        if command.is_empty() {
            return Some("Command must be a non-empty string".to_string());
        }

        let limits = &self.config.limits;
        if let Some(max) = limit(limits.max_arguments) {
            if args.len() as u64 > max {
                return Some(format!("Too many arguments (maximum {} allowed)", max));
            }
        }

        if let Some(max) = limit(limits.max_command_length) {
            let length = command.chars().count() + 1 + args.join(" ").chars().count();
            if length as u64 > max {
                return Some(format!(
                    "Command too long (maximum {} characters allowed)",
                    max
                ));
            }
        }

        None
    }

    fn validate_file_path(&self, path: &str) -> bool {
        let restriction = &self.config.path_restriction;
        if !restriction.enabled {
            return true;
        }

        if let Some(pattern) = &self.path_pattern {
            if !pattern.is_match(path) {
                return false;
            }
        }

        if let Some(max) = restriction.max_path_length {
            if path.chars().count() > max {
                return false;
            }
        }

        true
    }

    fn not_whitelisted(&self, command: &str) -> String {
        let allowed: Vec<&str> = self.config.command_rules.keys().map(String::as_str).collect();
        format!(
            "Command '{}' is not in the allowed whitelist. Allowed commands: {}",
            command,
            allowed.join(", ")
        )
    }

    /// Forbidden-pattern gate followed by the optional whitelist lookup.
    ///
    /// Returns the normalized command and its rule (if any).
    fn gate(
        &self,
        command: &str,
        args: &[String],
        enforce_whitelist: bool,
    ) -> Result<(String, Option<&CommandRule>), String> {
        if let Some(error) = self.check_input(command, args) {
            return Err(error);
        }

        let normalized = command.trim().to_lowercase();
        let rule = self.config.rule(&normalized);
        let unlisted = enforce_whitelist && rule.is_none();

        let line = format!("{} {}", normalized, args.join(" "));
        if let Some(pattern) = self.forbidden_match(&line) {
            let mut error = format!("Command contains forbidden pattern: {}", pattern);
            if unlisted {
                error.push_str(&format!(
                    "; command '{}' is not in the allowed whitelist",
                    normalized
                ));
            }
            return Err(error);
        }

        if unlisted {
            return Err(self.not_whitelisted(&normalized));
        }

        Ok((normalized, rule))
    }
}

fn is_safe_token(arg: &str) -> bool {
    arg.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-'))
}

fn trimmed_args(args: &[String]) -> impl Iterator<Item = &str> {
    args.iter().map(|a| a.trim()).filter(|a| !a.is_empty())
}

/// Policy evaluation strategy, one variant per enforced level
#[derive(Debug, Clone)]
pub enum Validator {
    /// Exact allow-listed arguments only
    Aggressive(CompiledPolicy),
    /// Flag prefixes and plain tokens are also accepted
    Medium(CompiledPolicy),
    /// Forbidden patterns only
    Minimal(CompiledPolicy),
    /// The `none` level: no filtering beyond input shape
    Unrestricted(CompiledPolicy),
}

impl Validator {
    /// Compile a policy and pick the strategy its level calls for.
    pub fn new(config: PolicyConfig) -> Result<Self, TermgateError> {
        let level = enforced_level(&config);
        let policy = CompiledPolicy::compile(config)?;
        Ok(match level {
            SecurityLevel::Aggressive | SecurityLevel::Custom => Self::Aggressive(policy),
            SecurityLevel::Medium => Self::Medium(policy),
            SecurityLevel::Minimal => Self::Minimal(policy),
            SecurityLevel::None => Self::Unrestricted(policy),
        })
    }

    pub fn compiled(&self) -> &CompiledPolicy {
        match self {
            Self::Aggressive(p) | Self::Medium(p) | Self::Minimal(p) | Self::Unrestricted(p) => p,
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        self.compiled().config()
    }

    /// Level whose rules are being enforced.
    pub fn level(&self) -> SecurityLevel {
        match self {
            Self::Aggressive(_) => SecurityLevel::Aggressive,
            Self::Medium(_) => SecurityLevel::Medium,
            Self::Minimal(_) => SecurityLevel::Minimal,
            Self::Unrestricted(_) => SecurityLevel::None,
        }
    }

    pub fn validate_command(&self, command: &str, args: &[String]) -> ValidationOutcome {
        let result = match self {
            Self::Aggressive(policy) => validate_aggressive(policy, command, args),
            Self::Medium(policy) => validate_medium(policy, command, args),
            Self::Minimal(policy) => validate_minimal(policy, command, args),
            Self::Unrestricted(_) => validate_unrestricted(command, args),
        };

        match result {
            Ok((command, args)) => ValidationOutcome::accept(command, args),
            Err(error) => ValidationOutcome::reject(error),
        }
    }

    /// Validate raw tool input, rejecting malformed shapes before any policy logic.
    pub fn validate_json(&self, command: &Value, args: &Value) -> ValidationOutcome {
        let Some(command) = command.as_str().filter(|c| !c.is_empty()) else {
            return ValidationOutcome::reject("Command must be a non-empty string");
        };

        let args = match args {
            Value::Null => Vec::new(),
            Value::Array(items) => {
                let strings: Option<Vec<String>> =
                    items.iter().map(|v| v.as_str().map(str::to_string)).collect();
                match strings {
                    Some(strings) => strings,
                    None => return ValidationOutcome::reject("All arguments must be strings"),
                }
            }
            _ => return ValidationOutcome::reject("Arguments must be an array"),
        };

        self.validate_command(command, &args)
    }

    pub fn validate_file_path(&self, path: &str) -> bool {
        self.compiled().validate_file_path(path)
    }

    pub fn build_environment(
        &self,
        snapshot: &EnvSnapshot,
        extra: Option<&BTreeMap<String, String>>,
    ) -> BTreeMap<String, String> {
        build_environment(&self.policy().environment_policy, snapshot, extra)
    }

    /// Effective timeout in milliseconds; `0` means no timeout.
    ///
    /// A requested value of `0` counts as absent.
    pub fn timeout(&self, requested: Option<u64>) -> u64 {
        let requested = requested.filter(|t| *t > 0);
        if let Self::Unrestricted(_) = self {
            return requested.unwrap_or(0);
        }

        let limits = &self.policy().limits;
        match limit(limits.timeout_max) {
            None => requested.or(limit(limits.timeout_default)).unwrap_or(0),
            Some(max) => requested
                .unwrap_or_else(|| limit(limits.timeout_default).unwrap_or(FALLBACK_TIMEOUT_MS))
                .min(max),
        }
    }
}

type Normalized = Result<(String, Vec<String>), String>;

fn validate_aggressive(policy: &CompiledPolicy, command: &str, args: &[String]) -> Normalized {
    let (command, rule) = policy.gate(command, args, true)?;
    let Some(rule) = rule else {
        return Err(policy.not_whitelisted(&command));
    };

    let mut accepted = Vec::with_capacity(args.len());
    for arg in trimmed_args(args) {
        let mut allowed = rule.allowed_args.iter().any(|a| a == arg);

        if rule.requires_file && !arg.starts_with('-') {
            if !policy.validate_file_path(arg) {
                return Err(format!("File path argument '{}' is not allowed", arg));
            }
            allowed = true;
        }

        if !allowed {
            return Err(format!(
                "Argument '{}' not allowed for command '{}'",
                arg, command
            ));
        }
        accepted.push(arg.to_string());
    }

    Ok((command, accepted))
}

fn validate_medium(policy: &CompiledPolicy, command: &str, args: &[String]) -> Normalized {
    let enforce = policy.config().has_whitelist();
    let (command, rule) = policy.gate(command, args, enforce)?;

    let mut accepted = Vec::with_capacity(args.len());
    for arg in trimmed_args(args) {
        if let Some(rule) = rule {
            let mut allowed = rule
                .allowed_args
                .iter()
                .any(|a| a == arg || (a.starts_with('-') && arg.starts_with(a.as_str())));

            if rule.requires_file && !arg.starts_with('-') {
                if !policy.validate_file_path(arg) {
                    return Err(format!("File path argument '{}' is not allowed", arg));
                }
                allowed = true;
            }

            if !allowed && !is_safe_token(arg) {
                return Err(format!(
                    "Argument '{}' not allowed for command '{}'",
                    arg, command
                ));
            }
        }
        accepted.push(arg.to_string());
    }

    Ok((command, accepted))
}

fn validate_minimal(policy: &CompiledPolicy, command: &str, args: &[String]) -> Normalized {
    let (command, _) = policy.gate(command, args, false)?;
    Ok((command, trimmed_args(args).map(str::to_string).collect()))
}

fn validate_unrestricted(command: &str, args: &[String]) -> Normalized {
    if command.is_empty() {
        return Err("Command must be a non-empty string".to_string());
    }
    Ok((command.trim().to_lowercase(), args.to_vec()))
}
