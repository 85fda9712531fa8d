//! Result and error types for Pagewright.

use crate::window::WindowError;
use thiserror::Error;

/// Result type for Pagewright operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while driving a scenario
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Configuration could not be assembled
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Browser name not handled by any driver
    #[error("Unsupported browser: {name}")]
    UnsupportedBrowser {
        /// Requested browser name
        name: String,
    },

    /// Remote endpoint runs a different browser than requested
    #[error("Browser mismatch: expected {expected}, driver reports {actual}")]
    BrowserMismatch {
        /// Requested browser and version
        expected: String,
        /// Product string reported by the endpoint
        actual: String,
    },

    /// Connection to the remote driver failed
    #[error("Failed to connect to browser at {url}: {message}")]
    ConnectionFailed {
        /// Driver URL
        url: String,
        /// Error message
        message: String,
    },

    /// Operation requires a session but the scenario has none
    #[error("No browser session: {message}")]
    NoSession {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Element could not be located
    #[error("Element not found: {locator}")]
    ElementNotFound {
        /// Locator description
        locator: String,
    },

    /// Element handle no longer refers to a live element
    #[error("Stale element handle: {id}")]
    StaleElement {
        /// Element handle id
        id: String,
    },

    /// Locator cannot be used in this context
    #[error("Invalid locator {locator}: {message}")]
    InvalidLocator {
        /// Locator description
        locator: String,
        /// Error message
        message: String,
    },

    /// Click or typing failed
    #[error("Interaction failed: {message}")]
    Interaction {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout {
        /// What was awaited
        what: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Page object name not registered
    #[error("Invalid page object name: {name}")]
    UnknownPage {
        /// Page name
        name: String,
    },

    /// Element name not declared on the page object
    #[error("Invalid page object element name: {element} (page {page})")]
    UnknownElement {
        /// Page name
        page: String,
        /// Element name
        element: String,
    },

    /// Registry file is malformed
    #[error("Registry error: {message}")]
    Registry {
        /// Error message
        message: String,
    },

    /// Window switching failed
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Any other failure reported by the driver
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarnessError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a generic session error
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }
}
