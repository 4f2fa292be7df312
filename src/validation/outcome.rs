/// Result of validating one command request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The request may run, with these normalized values
    Accepted { command: String, args: Vec<String> },
    /// The request is refused; nothing may run
    Rejected { error: String },
}

impl ValidationOutcome {
    pub fn accept(command: impl Into<String>, args: Vec<String>) -> Self {
        Self::Accepted {
            command: command.into(),
            args,
        }
    }

    pub fn reject(error: impl Into<String>) -> Self {
        Self::Rejected {
            error: error.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Rejected { error } => Some(error),
            Self::Accepted { .. } => None,
        }
    }

    /// The command line handed to the shell, `None` for rejections.
    pub fn command_line(&self) -> Option<String> {
        match self {
            Self::Accepted { command, args } if args.is_empty() => Some(command.clone()),
            Self::Accepted { command, args } => Some(format!("{} {}", command, args.join(" "))),
            Self::Rejected { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_joins_args() {
        let outcome = ValidationOutcome::accept("ls", vec!["-l".into(), "-a".into()]);
        assert_eq!(outcome.command_line().as_deref(), Some("ls -l -a"));
        assert_eq!(
            ValidationOutcome::accept("pwd", vec![]).command_line().as_deref(),
            Some("pwd")
        );
    }

    #[test]
    fn rejection_carries_error_only() {
        let outcome = ValidationOutcome::reject("nope");
        assert!(!outcome.is_accepted());
        assert_eq!(outcome.error(), Some("nope"));
        assert_eq!(outcome.command_line(), None);
    }
}
