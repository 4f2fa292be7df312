//! Compiled-in policies for the four built-in security levels.
//!
//! These are the single source of truth: policy documents on disk may override
//! them, but only after passing the same schema checks.

use std::collections::BTreeMap;

use super::policy::{
    CommandRule, EnvironmentPolicy, Limits, PathRestriction, PolicyConfig, SecurityLevel,
};

const SAFE_PATH_PATTERN: &str = "^/?[a-zA-Z0-9._/-]+$";

/// Compiled-in policy for a level. `Custom` has no default of its own and
/// maps to the aggressive policy.
pub fn builtin(level: SecurityLevel) -> PolicyConfig {
    match level {
        SecurityLevel::Aggressive | SecurityLevel::Custom => aggressive(),
        SecurityLevel::Medium => medium(),
        SecurityLevel::Minimal => minimal(),
        SecurityLevel::None => none(),
    }
}

fn rules(entries: Vec<(&str, CommandRule)>) -> BTreeMap<String, CommandRule> {
    entries
        .into_iter()
        .map(|(name, rule)| (name.to_string(), rule))
        .collect()
}

fn patterns(sources: &[&str]) -> Vec<String> {
    sources.iter().map(|s| s.to_string()).collect()
}

#[rustfmt::skip]
fn aggressive() -> PolicyConfig {
    PolicyConfig {
        level: SecurityLevel::Aggressive,
        description: "Maximum security - suitable for untrusted environments".to_string(),
        command_rules: rules(vec![
            ("ls", CommandRule::new("List directory contents", &["-l", "-a", "-la", "-h", "-R", "--help"])),
            ("cat", CommandRule::new("Display file contents", &["--help"]).with_file()),
            ("head", CommandRule::new("Display first lines of file", &["-n", "--help"]).with_file()),
            ("tail", CommandRule::new("Display last lines of file", &["-n", "--help"]).with_file()),
            ("file", CommandRule::new("Determine file type", &["--help"]).with_file()),
            ("wc", CommandRule::new("Word, line, character count", &["-l", "-w", "-c", "--help"]).with_file()),
            ("pwd", CommandRule::new("Print working directory", &["--help"])),
            ("find", CommandRule::new("Find files and directories", &["-name", "-type", "-maxdepth", "--help"])),
            ("tree", CommandRule::new("Display directory tree", &["-L", "-a", "--help"])),
            ("whoami", CommandRule::new("Show current user", &["--help"])),
            ("id", CommandRule::new("Show user and group IDs", &["--help"])),
            ("uname", CommandRule::new("System information", &["-a", "-r", "-s", "--help"])),
            ("date", CommandRule::new("Show current date and time", &["--help"])),
            ("uptime", CommandRule::new("Show system uptime", &["--help"])),
            ("df", CommandRule::new("Show disk space usage", &["-h", "--help"])),
            ("free", CommandRule::new("Show memory usage", &["-h", "--help"])),
            ("ps", CommandRule::new("Show running processes", &["aux", "--help"])),
            ("node", CommandRule::new("Node.js version", &["--version", "--help"])),
            ("npm", CommandRule::new("NPM operations (limited)", &["--version", "list", "--help"])),
            ("git", CommandRule::new("Git operations (read-only)", &["status", "log", "--oneline", "branch", "diff", "--help"])),
            ("which", CommandRule::new("Locate command", &["--help"])),
            ("type", CommandRule::new("Display command type", &["--help"])),
            ("grep", CommandRule::new("Search text patterns", &["-n", "-i", "-r", "--help"]).with_file()),
            ("sort", CommandRule::new("Sort lines", &["-n", "-r", "--help"]).with_file()),
            ("uniq", CommandRule::new("Report unique lines", &["-c", "--help"]).with_file()),
            ("man", CommandRule::new("Manual pages", &["--help"]).with_file()),
            ("help", CommandRule::new("Help command", &[])),
            ("echo", CommandRule::new("Display text (limited)", &["--help"])),
        ]),
        forbidden_patterns: patterns(&[
            r"[;&|`$(){}]",
            r"\brm\b|\bmv\b|\bcp\b|\btouch\b|\bmkdir\b|\brmdir\b",
            r"\bcurl\b|\bwget\b|\bssh\b|\bscp\b|\brsync\b|\bftp\b|\btelnet\b",
            r"\bsudo\b|\bsu\b|\bchmod\b|\bchown\b|\bmount\b|\bumount\b",
            r"\bkill\b|\bkillall\b|\bnohup\b|\bbg\b|\bfg\b|\bjobs\b",
            r"\bapt\b|\byum\b|\bpip\b|\binstall\b|\bremove\b|\bupdate\b|\bupgrade\b",
            r"\bvi\b|\bvim\b|\bnano\b|\bemacs\b|\btop\b|\bhtop\b|\bless\b|\bmore\b",
            r"\bsource\b|\b\.\b|\bexport\b|\balias\b|\bunalias\b|\bhistory\b",
            r"[<>]",
            r"[*?\[\]]",
        ]),
        path_restriction: PathRestriction {
            enabled: true,
            pattern: Some(SAFE_PATH_PATTERN.to_string()),
            max_path_length: Some(255),
        },
        environment_policy: EnvironmentPolicy::whitelist(&["PATH", "HOME", "USER", "SHELL"]),
        limits: Limits {
            max_arguments: 10,
            max_command_length: 1000,
            timeout_max: 10_000,
            timeout_default: 10_000,
        },
    }
}

#[rustfmt::skip]
fn medium() -> PolicyConfig {
    PolicyConfig {
        level: SecurityLevel::Medium,
        description: "Balanced security - suitable for trusted development environments"
            .to_string(),
        command_rules: rules(vec![
            // files and directories
            ("ls", CommandRule::new("List directory contents", &["-l", "-a", "-la", "-h", "-R", "-1", "-F", "-t", "-S", "--help"])),
            ("cat", CommandRule::new("Display file contents", &["-n", "-b", "-s", "--help"]).with_file()),
            ("head", CommandRule::new("Display first lines of file", &["-n", "-c", "--help"]).with_file()),
            ("tail", CommandRule::new("Display last lines of file", &["-n", "-c", "-f", "--help"]).with_file()),
            ("file", CommandRule::new("Determine file type", &["--help"]).with_file()),
            ("wc", CommandRule::new("Word, line, character count", &["-l", "-w", "-c", "--help"]).with_file()),
            ("pwd", CommandRule::new("Print working directory", &["--help"])),
            ("find", CommandRule::new("Find files and directories", &["-name", "-type", "-maxdepth", "--help"])),
            ("tree", CommandRule::new("Display directory tree", &["-L", "-a", "--help"])),
            // system information
            ("whoami", CommandRule::new("Show current user", &["--help"])),
            ("id", CommandRule::new("Show user and group IDs", &["--help"])),
            ("uname", CommandRule::new("System information", &["-a", "-r", "-s", "--help"])),
            ("date", CommandRule::new("Show current date and time", &["--help"])),
            ("uptime", CommandRule::new("Show system uptime", &["--help"])),
            ("df", CommandRule::new("Show disk space usage", &["-h", "--help"])),
            ("free", CommandRule::new("Show memory usage", &["-h", "--help"])),
            ("ps", CommandRule::new("Process status", &["aux", "ef", "-u", "-p", "--help"])),
            ("netstat", CommandRule::new("Network statistics", &["-tuln", "-r", "--help"])),
            ("lsof", CommandRule::new("List open files", &["-i", "-p", "-u", "--help"])),
            // text processing
            ("grep", CommandRule::new("Search text patterns", &["-n", "-i", "-r", "-v", "-c", "-l", "-w", "-x", "-E", "-F", "--help"]).with_file()),
            ("sed", CommandRule::new("Stream editor", &["-n", "-e", "-f", "--help"]).with_file()),
            ("awk", CommandRule::new("Pattern scanning and processing", &["-F", "-v", "--help"]).with_file()),
            ("sort", CommandRule::new("Sort lines", &["-n", "-r", "--help"]).with_file()),
            ("uniq", CommandRule::new("Report unique lines", &["-c", "--help"]).with_file()),
            // development tools
            ("node", CommandRule::new("Node.js runtime", &["--version", "--help", "-e", "-p", "--eval", "--print"])),
            ("npm", CommandRule::new("NPM operations", &["--version", "list", "ls", "info", "view", "search", "outdated", "--help"])),
            ("git", CommandRule::new("Git operations", &["status", "log", "--oneline", "branch", "diff", "show", "config", "--help"])),
            ("which", CommandRule::new("Locate command", &["--help"])),
            ("type", CommandRule::new("Display command type", &["--help"])),
            ("man", CommandRule::new("Manual pages", &["--help"]).with_file()),
            ("help", CommandRule::new("Help command", &[])),
            ("echo", CommandRule::new("Display text (limited)", &["--help"])),
        ]),
        forbidden_patterns: patterns(&[
            r"[;&|`$(){}]",
            r"\brm\b -rf|\brm\b -fr",
            r"\bsudo\b|\bsu\b",
            r"\bkill\b -9|\bkillall\b",
            r"\bchmod\b 777|\bchown\b root",
        ]),
        path_restriction: PathRestriction {
            enabled: true,
            pattern: Some(SAFE_PATH_PATTERN.to_string()),
            max_path_length: Some(1000),
        },
        environment_policy: EnvironmentPolicy::blacklist(&[
            "PASSWORD", "SECRET", "TOKEN", "KEY", "PRIVATE",
        ]),
        limits: Limits {
            max_arguments: 20,
            max_command_length: 2000,
            timeout_max: 30_000,
            timeout_default: 10_000,
        },
    }
}

fn minimal() -> PolicyConfig {
    PolicyConfig {
        level: SecurityLevel::Minimal,
        description: "Minimal security - basic safety nets for trusted environments".to_string(),
        command_rules: BTreeMap::new(),
        forbidden_patterns: patterns(&[r"\bsudo\b rm -rf /", r"\bchmod\b 777 /"]),
        path_restriction: PathRestriction::disabled(),
        environment_policy: EnvironmentPolicy::Passthrough,
        limits: Limits {
            max_arguments: 100,
            max_command_length: 10_000,
            timeout_max: 300_000,
            timeout_default: 30_000,
        },
    }
}

fn none() -> PolicyConfig {
    PolicyConfig {
        level: SecurityLevel::None,
        description: "Zero security limits - complete freedom (maximum trust only, also UNSAFE)"
            .to_string(),
        command_rules: BTreeMap::new(),
        forbidden_patterns: Vec::new(),
        path_restriction: PathRestriction::disabled(),
        environment_policy: EnvironmentPolicy::Passthrough,
        limits: Limits::unlimited(),
    }
}
