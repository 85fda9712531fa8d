//! Wait mechanisms.
//!
//! Explicit waits poll a [`BrowserSession`] until a [`WaitCondition`] holds
//! or the budget in [`WaitOptions`] runs out. Errors raised by the session
//! during a poll mean "not yet": the element may not be attached, or the
//! window may be navigating.

use crate::config::Config;
use crate::locator::Locator;
use crate::result::{HarnessError, HarnessResult};
use crate::session::{BrowserSession, ElementHandle};
use regex::Regex;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Element waits under the given config
    #[must_use]
    pub fn for_elements(config: &Config) -> Self {
        Self::new().with_timeout(config.element_timeout)
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT CONDITIONS
// =============================================================================

/// Something to wait for
#[derive(Debug, Clone)]
pub enum WaitCondition {
    /// At least one element matches the locator
    Located(Locator),
    /// At least one matching element is displayed
    Visible(Locator),
    /// The active window title matches
    TitleMatches(Regex),
    /// The active window URL matches
    UrlMatches(Regex),
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Located(l) => write!(f, "element {l} to be located"),
            Self::Visible(l) => write!(f, "element {l} to be visible"),
            Self::TitleMatches(r) => write!(f, "title to match /{r}/"),
            Self::UrlMatches(r) => write!(f, "url to match /{r}/"),
        }
    }
}

/// Result of a satisfied wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Elements that satisfied the condition; empty for title and url waits
    pub elements: Vec<ElementHandle>,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of polls made
    pub polls: u32,
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll until `condition` holds.
///
/// The condition is always checked at least once, even with a zero
/// timeout.
pub async fn wait_for(
    session: &dyn BrowserSession,
    condition: &WaitCondition,
    options: &WaitOptions,
) -> HarnessResult<WaitOutcome> {
    let started = Instant::now();
    let timeout = options.timeout();
    let mut polls = 0_u32;

    loop {
        polls += 1;
        match check(session, condition).await {
            Ok(Some(elements)) => {
                return Ok(WaitOutcome {
                    elements,
                    elapsed: started.elapsed(),
                    polls,
                })
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(%condition, error = %e, "wait poll failed"),
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(HarnessError::Timeout {
                what: condition.to_string(),
                ms: options.timeout_ms,
            });
        }
        tokio::time::sleep(options.poll_interval().min(timeout - elapsed)).await;
    }
}

async fn check(
    session: &dyn BrowserSession,
    condition: &WaitCondition,
) -> HarnessResult<Option<Vec<ElementHandle>>> {
    match condition {
        WaitCondition::Located(locator) => {
            let found = session.find_elements(locator, None).await?;
            Ok((!found.is_empty()).then_some(found))
        }
        WaitCondition::Visible(locator) => {
            let mut visible = Vec::new();
            for element in session.find_elements(locator, None).await? {
                if session.is_displayed(&element).await? {
                    visible.push(element);
                }
            }
            Ok((!visible.is_empty()).then_some(visible))
        }
        WaitCondition::TitleMatches(pattern) => {
            let title = session.title().await?;
            Ok(pattern.is_match(&title).then(Vec::new))
        }
        WaitCondition::UrlMatches(pattern) => {
            let url = session.current_url().await?;
            Ok(pattern.is_match(&url).then(Vec::new))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{MockElement, MockSession, MockWindow};

    mod options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let options = WaitOptions::default();
            assert_eq!(options.timeout(), Duration::from_secs(10));
            assert_eq!(options.poll_interval(), Duration::from_millis(100));
        }

        #[test]
        fn test_for_elements_uses_element_timeout() {
            let config = Config::default().with_element_timeout(2500);
            assert_eq!(WaitOptions::for_elements(&config).timeout_ms, 2500);
        }

        #[test]
        fn test_condition_display() {
            let condition = WaitCondition::Visible(Locator::id("go"));
            assert_eq!(condition.to_string(), "element id=go to be visible");
        }
    }

    mod polling_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_located_immediately() {
            let locator = Locator::id("go");
            let session = MockSession::new().with_window(
                MockWindow::new("h1", "Main").with_element(MockElement::new(locator.clone(), "Go")),
            );

            let outcome = wait_for(&session, &WaitCondition::Located(locator), &WaitOptions::new())
                .await
                .unwrap();

            assert_eq!(outcome.polls, 1);
            assert_eq!(outcome.elements.len(), 1);
            assert_eq!(outcome.elapsed, Duration::ZERO);
        }

        #[tokio::test(start_paused = true)]
        async fn test_element_appearing_later() {
            let locator = Locator::css(".late");
            let session = MockSession::new().with_window(
                MockWindow::new("h1", "Main")
                    .with_element(MockElement::new(locator.clone(), "").appearing_after(3)),
            );

            let outcome = wait_for(&session, &WaitCondition::Located(locator), &WaitOptions::new())
                .await
                .unwrap();

            assert_eq!(outcome.polls, 4);
            assert_eq!(outcome.elapsed, Duration::from_millis(300));
        }

        #[tokio::test(start_paused = true)]
        async fn test_hidden_element_times_out() {
            let locator = Locator::css(".ghost");
            let session = MockSession::new().with_window(
                MockWindow::new("h1", "Main").with_element(MockElement::new(locator.clone(), "").hidden()),
            );
            let started = Instant::now();

            let err = wait_for(
                &session,
                &WaitCondition::Visible(locator),
                &WaitOptions::new().with_timeout(1000),
            )
            .await
            .unwrap_err();

            match err {
                HarnessError::Timeout { what, ms } => {
                    assert_eq!(ms, 1000);
                    assert!(what.contains(".ghost"));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(started.elapsed(), Duration::from_secs(1));
        }

        #[tokio::test(start_paused = true)]
        async fn test_zero_timeout_polls_once() {
            let session = MockSession::new().with_window(MockWindow::new("h1", "Main"));

            let result = wait_for(
                &session,
                &WaitCondition::Located(Locator::id("nope")),
                &WaitOptions::new().with_timeout(0),
            )
            .await;

            assert!(result.is_err());
            assert_eq!(
                session.calls().iter().filter(|c| c.starts_with("find_elements")).count(),
                1
            );
        }

        #[tokio::test]
        async fn test_title_and_url() {
            let session = MockSession::new()
                .with_window(MockWindow::new("h1", "Dashboard").with_url("http://app.test/home"));

            let title = WaitCondition::TitleMatches(Regex::new("^Dash").unwrap());
            let url = WaitCondition::UrlMatches(Regex::new("/home$").unwrap());
            let options = WaitOptions::new().with_timeout(0);

            assert!(wait_for(&session, &title, &options).await.unwrap().elements.is_empty());
            assert!(wait_for(&session, &url, &options).await.is_ok());
        }

        #[tokio::test(start_paused = true)]
        async fn test_session_errors_mean_not_yet() {
            // no windows: every title read fails
            let session = MockSession::new();
            let condition = WaitCondition::TitleMatches(Regex::new(".*").unwrap());

            let err = wait_for(&session, &condition, &WaitOptions::new().with_timeout(200))
                .await
                .unwrap_err();

            assert!(matches!(err, HarnessError::Timeout { ms: 200, .. }));
        }
    }
}
