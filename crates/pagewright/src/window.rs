//! Window switching.
//!
//! Windows open and close under application control, asynchronously to the
//! test. A single pass over the window handles is racy: a handle listed a
//! moment ago may be gone by the time we switch to it. The resolver
//! therefore polls: each pass probes every listed handle in order, skips
//! handles that fail, and passes repeat once a second until the configured
//! budget is spent.
//!
//! ```text
//!            unknown name
//!   call ───────────────────────────────► Err(UnknownWindowName)
//!    │
//!    ▼
//!  Searching ──title matches──► Done: Ok(handle), window left active
//!    │   ▲
//!    │   └── sleep(wait) ◄── pass without match, passes left
//!    └── passes exhausted ────► Done: Err(WindowNotFound)
//! ```

use crate::result::{HarnessError, HarnessResult};
use crate::session::{BrowserSession, WindowHandle};
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Pause between two passes when a budget is configured
pub const SWITCH_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Errors that cross the resolver boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// Name missing from the registry; a caller bug, never retried
    #[error("Unknown window name: {0}")]
    UnknownWindowName(String),

    /// No window title matched within the budget
    #[error("Window {name:?} not found within {timeout_ms}ms (last titles seen: {last_titles:?})")]
    WindowNotFound {
        /// Requested window name
        name: String,
        /// Budget that was spent
        timeout_ms: u64,
        /// Titles observed during the final pass
        last_titles: Vec<String>,
    },
}

/// A logical window: a name and the title pattern that identifies it
#[derive(Debug, Clone)]
pub struct WindowDescriptor {
    name: String,
    title: Regex,
}

impl WindowDescriptor {
    /// Compile a descriptor from a title pattern
    pub fn new(name: impl Into<String>, title_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::from_regex(name, Regex::new(title_pattern)?))
    }

    /// Create a descriptor from a compiled pattern
    #[must_use]
    pub fn from_regex(name: impl Into<String>, title: Regex) -> Self {
        Self {
            name: name.into(),
            title,
        }
    }

    /// Logical name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Title pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.title.as_str()
    }

    /// Whether a window title identifies this window
    #[must_use]
    pub fn matches(&self, title: &str) -> bool {
        self.title.is_match(title)
    }
}

/// Static table of known windows, assembled once at startup
#[derive(Debug, Clone, Default)]
pub struct WindowRegistry {
    windows: HashMap<String, WindowDescriptor>,
}

impl WindowRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor; names must be unique
    pub fn register(&mut self, descriptor: WindowDescriptor) -> HarnessResult<()> {
        if self.windows.contains_key(descriptor.name()) {
            return Err(HarnessError::Registry {
                message: format!("window {:?} registered twice", descriptor.name()),
            });
        }
        let _ = self
            .windows
            .insert(descriptor.name().to_string(), descriptor);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, descriptor: WindowDescriptor) -> HarnessResult<Self> {
        self.register(descriptor)?;
        Ok(self)
    }

    /// Look up a descriptor
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&WindowDescriptor> {
        self.windows.get(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.windows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered windows
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether no window is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// How many passes to make and how long to pause after each miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPlan {
    /// Number of passes over the window handles
    pub passes: u32,
    /// Pause after a pass without match
    pub wait: Duration,
}

impl RetryPlan {
    /// Plan for a total budget; no budget (or zero) means one pass, no pause
    #[must_use]
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(budget) if !budget.is_zero() => {
                let passes = budget.as_millis() / SWITCH_POLL_INTERVAL.as_millis();
                Self {
                    passes: u32::try_from(passes).unwrap_or(u32::MAX).max(1),
                    wait: SWITCH_POLL_INTERVAL,
                }
            }
            _ => Self {
                passes: 1,
                wait: Duration::ZERO,
            },
        }
    }

    /// Time spent sleeping when every pass misses
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.wait * self.passes
    }
}

/// One handle probed during one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchAttempt {
    /// Zero-based pass number
    pub retry_index: u32,
    /// Handle probed
    pub handle_tried: WindowHandle,
    /// Title read after switching; None when the switch or the read failed
    pub title_observed: Option<String>,
    /// Whether the title matched
    pub matched: bool,
}

/// Make the window registered as `name` the active one.
///
/// On success the matched window stays active; the previously active window
/// is not restored. Per-handle failures during a pass are absorbed.
pub async fn switch_to_window(
    session: &mut dyn BrowserSession,
    registry: &WindowRegistry,
    name: &str,
    timeout: Option<Duration>,
) -> Result<WindowHandle, WindowError> {
    let descriptor = registry
        .get(name)
        .ok_or_else(|| WindowError::UnknownWindowName(name.to_string()))?;
    let plan = RetryPlan::from_timeout(timeout);
    let mut last_titles = Vec::new();

    for retry_index in 0..plan.passes {
        let attempts = probe_pass(session, descriptor, retry_index).await;
        if let Some(hit) = attempts.iter().find(|a| a.matched) {
            tracing::debug!(
                window = name,
                handle = %hit.handle_tried,
                pass = retry_index,
                "switched to window"
            );
            return Ok(hit.handle_tried.clone());
        }
        last_titles = attempts
            .into_iter()
            .filter_map(|a| a.title_observed)
            .collect();
        if !plan.wait.is_zero() {
            tokio::time::sleep(plan.wait).await;
        }
    }

    Err(WindowError::WindowNotFound {
        name: name.to_string(),
        timeout_ms: timeout.map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
        last_titles,
    })
}

/// Probe every listed handle once; stops at the first match, which is
/// left active
async fn probe_pass(
    session: &mut dyn BrowserSession,
    descriptor: &WindowDescriptor,
    retry_index: u32,
) -> Vec<SwitchAttempt> {
    let handles = match session.window_handles().await {
        Ok(handles) => handles,
        Err(e) => {
            tracing::debug!(pass = retry_index, error = %e, "listing window handles failed");
            return Vec::new();
        }
    };

    let mut attempts = Vec::with_capacity(handles.len());
    for handle in handles {
        let title = match session.switch_to_window(&handle).await {
            Ok(()) => session.title().await,
            Err(e) => Err(e),
        };
        let attempt = match title {
            Ok(title) => SwitchAttempt {
                retry_index,
                matched: descriptor.matches(&title),
                title_observed: Some(title),
                handle_tried: handle,
            },
            Err(e) => {
                tracing::debug!(
                    pass = retry_index,
                    handle = %handle,
                    error = %e,
                    "skipping window handle"
                );
                SwitchAttempt {
                    retry_index,
                    handle_tried: handle,
                    title_observed: None,
                    matched: false,
                }
            }
        };
        tracing::trace!(?attempt, window = descriptor.name(), "window probed");
        let matched = attempt.matched;
        attempts.push(attempt);
        if matched {
            break;
        }
    }
    attempts
}

/// Whether the window registered as `name` can be found within the budget.
///
/// The window that was active before the probe is restored on both
/// outcomes. Unregistered names are still an error.
pub async fn is_window_open(
    session: &mut dyn BrowserSession,
    registry: &WindowRegistry,
    name: &str,
    timeout: Option<Duration>,
) -> Result<bool, WindowError> {
    if registry.get(name).is_none() {
        return Err(WindowError::UnknownWindowName(name.to_string()));
    }
    let previous = session.active_window().await.ok();
    let outcome = switch_to_window(session, registry, name, timeout).await;

    if let Some(previous) = previous {
        if let Err(e) = session.switch_to_window(&previous).await {
            tracing::warn!(handle = %previous, error = %e, "could not restore previous window");
        }
    }

    match outcome {
        Ok(_) => Ok(true),
        Err(WindowError::WindowNotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}
