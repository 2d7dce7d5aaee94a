//! Structured configuration issues.
//!
//! Raw configuration (TOML, env) is converted into typed settings with a list
//! of issues. Warnings fall back to a default; errors abort startup.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: a default was used instead.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigIssueCode {
    /// A string field did not parse into its enum.
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// A numeric field is outside its allowed range.
    OutOfRange { field: String, value: f64 },
    /// The consensus policy string did not parse.
    InvalidPolicy { value: String },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let issue = ConfigIssue::error(
            ConfigIssueCode::OutOfRange {
                field: "reasoning.max_iterations".to_string(),
                value: 0.0,
            },
            "reasoning.max_iterations must be at least 1",
        );
        assert!(issue.is_error());

        let issue = ConfigIssue::warning(
            ConfigIssueCode::InvalidPolicy {
                value: "most".to_string(),
            },
            "falling back",
        );
        assert!(!issue.is_error());
    }
}
