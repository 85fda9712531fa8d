//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// At least one scenario failed
    #[error(
        "run failed: {failed_steps} step(s) failed, {hook_errors} hook error(s), {parsing_errors} parsing error(s)"
    )]
    ScenariosFailed {
        /// Number of failed steps
        failed_steps: usize,
        /// Number of failed hooks
        hook_errors: usize,
        /// Number of feature files that could not be parsed
        parsing_errors: usize,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pagewright library error
    #[error(transparent)]
    Harness(#[from] pagewright::HarnessError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        assert_eq!(
            CliError::config("bad").to_string(),
            "Configuration error: bad"
        );
    }

    #[test]
    fn test_harness_error_is_transparent() {
        let err: CliError = pagewright::HarnessError::UnknownPage {
            name: "home".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Invalid page object name: home");
    }

    #[test]
    fn test_scenarios_failed() {
        let err = CliError::ScenariosFailed {
            failed_steps: 2,
            hook_errors: 1,
            parsing_errors: 0,
        };
        assert_eq!(
            err.to_string(),
            "run failed: 2 step(s) failed, 1 hook error(s), 0 parsing error(s)"
        );
    }
}
