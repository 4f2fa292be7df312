use std::collections::BTreeMap;

use crate::config::EnvironmentPolicy;

/// Immutable copy of the server's environment, taken once and injected into
/// the policy engine so that filtering never reads process globals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment. Variables that are not valid
    /// UTF-8 are skipped.
    pub fn capture() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Derive a child environment from the snapshot. Extra variables are applied
/// last and override anything copied.
pub fn build_environment(
    policy: &EnvironmentPolicy,
    snapshot: &EnvSnapshot,
    extra: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = match policy {
        EnvironmentPolicy::Whitelist { allowed_vars } => allowed_vars
            .iter()
            .filter_map(|name| Some((name.clone(), snapshot.get(name)?.to_string())))
            .collect(),
        EnvironmentPolicy::Blacklist { blocked_vars } => snapshot
            .iter()
            .filter(|(name, _)| !blocked_vars.contains(*name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        EnvironmentPolicy::Passthrough => snapshot
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    };

    if let Some(extra) = extra {
        env.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    env
}
