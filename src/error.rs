use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while validating or running a job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Missing form field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// samtools did not produce an index for the user's template.
    #[error("Building index of the custom template failed")]
    TemplateIndex,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} did not finish within {secs} seconds")]
    Timeout { tool: &'static str, secs: u64 },

    #[error("Expected output was not produced: {}", .0.display())]
    MissingOutput(PathBuf),
}

impl JobError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by what the user submitted.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_) | Self::InvalidField { .. } | Self::TemplateIndex
        )
    }
}

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_client_errors() {
        assert!(JobError::MissingField("retain").is_client_error());
        assert!(JobError::invalid("size_start", "not a number").is_client_error());
        assert!(JobError::TemplateIndex.is_client_error());
    }

    #[test]
    fn tool_failures_are_server_errors() {
        let err = JobError::Timeout {
            tool: "primer3",
            secs: 5,
        };
        assert!(!err.is_client_error());
        assert!(!JobError::MissingOutput(PathBuf::from("x.html")).is_client_error());
    }
}
