use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{info, warn};

use super::environment::EnvSnapshot;
use super::outcome::ValidationOutcome;
use super::validator::Validator;
use crate::config::{PolicyConfig, SecurityLevel, builtin};
use crate::error::TermgateError;

/// A validator bound to an environment snapshot.
///
/// Everything the engine decides is a function of the injected policy and
/// snapshot, so independent engines can coexist in one process.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    validator: Validator,
    env: EnvSnapshot,
}

impl PolicyEngine {
    pub fn new(config: PolicyConfig, env: EnvSnapshot) -> Result<Self, TermgateError> {
        let validator = Validator::new(config)?;
        Ok(Self { validator, env })
    }

    /// Engine for the compiled-in aggressive policy.
    pub fn strictest(env: EnvSnapshot) -> Self {
        let validator = Validator::new(builtin(SecurityLevel::Aggressive))
            .expect("compiled-in aggressive policy is valid");
        Self { validator, env }
    }

    /// Swap in a new policy. On failure the current policy stays active.
    pub fn refresh(&mut self, config: PolicyConfig) -> Result<(), TermgateError> {
        let validator = Validator::new(config).inspect_err(|e| {
            warn!(error = %e, "policy refresh rejected, keeping current policy");
        })?;
        info!(
            from = %self.validator.level(),
            to = %validator.level(),
            "policy refreshed"
        );
        self.validator = validator;
        Ok(())
    }

    pub fn environment(&self) -> &EnvSnapshot {
        &self.env
    }

    pub fn policy(&self) -> &PolicyConfig {
        self.validator.policy()
    }

    pub fn level(&self) -> SecurityLevel {
        self.validator.level()
    }

    pub fn description(&self) -> &str {
        &self.policy().description
    }

    pub fn allowed_command_count(&self) -> usize {
        self.policy().command_rules.len()
    }

    pub fn validate_command(&self, command: &str, args: &[String]) -> ValidationOutcome {
        self.validator.validate_command(command, args)
    }

    pub fn validate_json(&self, command: &Value, args: &Value) -> ValidationOutcome {
        self.validator.validate_json(command, args)
    }

    pub fn validate_file_path(&self, path: &str) -> bool {
        self.validator.validate_file_path(path)
    }

    pub fn build_environment(
        &self,
        extra: Option<&BTreeMap<String, String>>,
    ) -> BTreeMap<String, String> {
        self.validator.build_environment(&self.env, extra)
    }

    /// Effective timeout in milliseconds; `0` means no timeout.
    pub fn timeout(&self, requested: Option<u64>) -> u64 {
        self.validator.timeout(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> EnvSnapshot {
        [("PATH", "/bin"), ("SECRET", "x"), ("HOME", "/root")]
            .into_iter()
            .collect()
    }

    #[test]
    fn engines_are_isolated() {
        let strict = PolicyEngine::strictest(env());
        let open = PolicyEngine::new(builtin(SecurityLevel::None), EnvSnapshot::default()).unwrap();

        assert!(!strict.validate_command("python3", &[]).is_accepted());
        assert!(open.validate_command("python3", &[]).is_accepted());
        assert_eq!(strict.build_environment(None).len(), 2);
        assert!(open.build_environment(None).is_empty());
    }

    #[test]
    fn refresh_replaces_policy() {
        let mut engine = PolicyEngine::strictest(env());
        assert_eq!(engine.level(), SecurityLevel::Aggressive);
        assert_eq!(engine.allowed_command_count(), 28);

        engine.refresh(builtin(SecurityLevel::Minimal)).unwrap();
        assert_eq!(engine.level(), SecurityLevel::Minimal);
        assert_eq!(engine.allowed_command_count(), 0);
        assert!(engine.validate_command("python3", &[]).is_accepted());
        assert_eq!(engine.build_environment(None).len(), 3);
    }

    #[test]
    fn failed_refresh_keeps_current_policy() {
        let mut engine = PolicyEngine::strictest(env());
        let mut broken = builtin(SecurityLevel::None);
        broken.forbidden_patterns.push("[".to_string());

        assert!(engine.refresh(broken).is_err());
        assert_eq!(engine.level(), SecurityLevel::Aggressive);
    }
}
