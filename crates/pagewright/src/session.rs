//! BrowserSession - abstract browser automation trait
//!
//! Every world operation goes through [`BrowserSession`], so the same
//! scenarios run against the real CDP driver (`browser` feature) or the
//! in-memory [`MockSession`](crate::mock::MockSession).
//!
//! ```text
//! ┌──────────────┐   open()   ┌───────────────────┐
//! │SessionFactory│──────────► │ Box<dyn Session>  │
//! └──────────────┘            ├─────────┬─────────┤
//!                             │CdpSession│MockSession
//!                             └─────────┴─────────┘
//! ```

use crate::config::{BrowserName, Config};
use crate::locator::Locator;
use crate::result::HarnessResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, session-scoped identifier of one open window.
///
/// A handle may go stale at any time when the application closes the
/// window behind our back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(String);

impl WindowHandle {
    /// Wrap a driver-specific id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Underlying id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a located DOM element, valid for the session that found it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    /// Session-assigned id
    pub id: String,
    /// Locator the element was found with
    pub locator: Locator,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, locator: Locator) -> Self {
        Self {
            id: id.into(),
            locator,
        }
    }
}

/// Session capabilities requested from the driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Browser to drive
    pub browser_name: BrowserName,
    /// Expected version prefix
    pub browser_version: Option<String>,
    /// Human readable session name (the scenario name)
    pub session_name: String,
    /// Window width in CSS pixels
    pub window_width: u32,
    /// Window height in CSS pixels
    pub window_height: u32,
    /// Accept self-signed / invalid TLS certificates
    pub accept_insecure_certs: bool,
    /// Extra browser arguments
    pub arguments: Vec<String>,
}

impl Capabilities {
    /// Capabilities for a scenario under the given config
    #[must_use]
    pub fn for_session(config: &Config, session_name: impl Into<String>) -> Self {
        let arguments = match config.browser_name {
            BrowserName::Chrome => vec!["start-maximized".to_string(), "--no-sandbox".to_string()],
            BrowserName::Firefox => Vec::new(),
        };
        Self {
            browser_name: config.browser_name,
            browser_version: config.browser_version.clone(),
            session_name: session_name.into(),
            window_width: 1920,
            window_height: 1080,
            accept_insecure_certs: true,
            arguments,
        }
    }

    /// `name version` as shown in mismatch errors
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.browser_version {
            Some(v) => format!("{} {v}", self.browser_name),
            None => self.browser_name.to_string(),
        }
    }
}

/// Abstract driver trait for browser automation
///
/// # Implementations
///
/// - `CdpSession` - Chrome DevTools Protocol via chromiumoxide (`browser` feature)
/// - `MockSession` - scripted in-memory session for tests
#[async_trait]
pub trait BrowserSession: Send + Sync + fmt::Debug {
    /// Snapshot of the currently open windows, in driver order
    async fn window_handles(&self) -> HarnessResult<Vec<WindowHandle>>;

    /// Handle of the active window
    async fn active_window(&self) -> HarnessResult<WindowHandle>;

    /// Make a window active; fails when the handle is stale
    async fn switch_to_window(&mut self, handle: &WindowHandle) -> HarnessResult<()>;

    /// Title of the active window; fails when the window is gone
    async fn title(&self) -> HarnessResult<String>;

    /// URL of the active window
    async fn current_url(&self) -> HarnessResult<String>;

    /// Navigate the active window
    async fn navigate(&mut self, url: &str) -> HarnessResult<()>;

    /// All elements matching `locator`, optionally below `parent`
    async fn find_elements(
        &self,
        locator: &Locator,
        parent: Option<&ElementHandle>,
    ) -> HarnessResult<Vec<ElementHandle>>;

    /// Click an element
    async fn click(&self, element: &ElementHandle) -> HarnessResult<()>;

    /// Type text into an element
    async fn type_text(&self, element: &ElementHandle, text: &str) -> HarnessResult<()>;

    /// Visible text of an element
    async fn text(&self, element: &ElementHandle) -> HarnessResult<String>;

    /// Whether the element is rendered with a non-empty box
    async fn is_displayed(&self, element: &ElementHandle) -> HarnessResult<bool>;

    /// PNG screenshot of the active window
    async fn screenshot(&self) -> HarnessResult<Vec<u8>>;

    /// End the session
    async fn quit(&mut self) -> HarnessResult<()>;
}

/// Builds one session per scenario
#[async_trait]
pub trait SessionFactory: Send + Sync + fmt::Debug {
    /// Open a session with the given capabilities
    async fn open(
        &self,
        config: &Config,
        capabilities: &Capabilities,
    ) -> HarnessResult<Box<dyn BrowserSession>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_window_handle_display() {
        let handle = WindowHandle::new("h1");
        assert_eq!(handle.to_string(), "h1");
        assert_eq!(handle.as_str(), "h1");
    }

    #[test]
    fn test_chrome_capabilities() {
        let caps = Capabilities::for_session(&Config::default(), "login works");
        assert_eq!(caps.session_name, "login works");
        assert_eq!((caps.window_width, caps.window_height), (1920, 1080));
        assert!(caps.arguments.contains(&"--no-sandbox".to_string()));
        assert!(caps.accept_insecure_certs);
    }

    #[test]
    fn test_firefox_capabilities_have_no_chrome_arguments() {
        let config = Config::default().with_browser(BrowserName::Firefox);
        let caps = Capabilities::for_session(&config, "s");
        assert!(caps.arguments.is_empty());
        assert_eq!(caps.describe(), "firefox");
    }

    #[test]
    fn test_describe_with_version() {
        let mut config = Config::default();
        config.browser_version = Some("120".to_string());
        assert_eq!(Capabilities::for_session(&config, "s").describe(), "chrome 120");
    }
}
