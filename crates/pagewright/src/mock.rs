//! Scriptable in-memory browser session.
//!
//! [`MockSession`] plays the part of a remote browser in unit tests and in
//! the cucumber suite: windows can be scripted to go stale, to fail title
//! reads, or to open only after a number of handle listings, and elements
//! can open new windows when clicked.

use crate::config::Config;
use crate::locator::Locator;
use crate::result::{HarnessError, HarnessResult};
use crate::session::{BrowserSession, Capabilities, ElementHandle, SessionFactory, WindowHandle};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

/// PNG signature returned as screenshot data unless overridden
pub const MOCK_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Scripted failure of a mock window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFault {
    /// Listed, but switching to it fails as if it closed after enumeration
    StaleOnSwitch,
    /// Switching works, reading the title fails
    GoneOnTitle,
}

/// A window of the mock browser
#[derive(Debug, Clone)]
pub struct MockWindow {
    /// Handle reported by the session
    pub handle: WindowHandle,
    /// Document title
    pub title: String,
    /// Current URL
    pub url: String,
    /// Elements in the document
    pub elements: Vec<MockElement>,
    /// Number of handle listings the window is absent from
    pub opens_after: u32,
    /// Scripted failure
    pub fault: Option<MockFault>,
}

impl MockWindow {
    /// Create a window with a handle and a title
    #[must_use]
    pub fn new(handle: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            handle: WindowHandle::new(handle),
            title: title.into(),
            url: "about:blank".to_string(),
            elements: Vec::new(),
            opens_after: 0,
            fault: None,
        }
    }

    /// Set the URL
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Add an element
    #[must_use]
    pub fn with_element(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Only list the window from the `(n + 1)`-th listing on
    #[must_use]
    pub const fn opening_after(mut self, listings: u32) -> Self {
        self.opens_after = listings;
        self
    }

    /// Script a failure
    #[must_use]
    pub const fn with_fault(mut self, fault: MockFault) -> Self {
        self.fault = Some(fault);
        self
    }
}

/// An element of a mock window
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Locator that finds this element
    pub locator: Locator,
    /// Locator of the enclosing element, if nested
    pub parent: Option<Locator>,
    /// Visible text
    pub text: String,
    /// Rendered with a box
    pub displayed: bool,
    /// Number of lookups that miss before the element shows up
    pub found_after: u32,
    /// Window opened when the element is clicked
    pub opens: Option<Box<MockWindow>>,
}

impl MockElement {
    /// Create a displayed element
    #[must_use]
    pub fn new(locator: Locator, text: impl Into<String>) -> Self {
        Self {
            locator,
            parent: None,
            text: text.into(),
            displayed: true,
            found_after: 0,
            opens: None,
        }
    }

    /// Nest under another element
    #[must_use]
    pub fn inside(mut self, parent: Locator) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Present in the DOM but not rendered
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Missing from the first `lookups` lookups
    #[must_use]
    pub const fn appearing_after(mut self, lookups: u32) -> Self {
        self.found_after = lookups;
        self
    }

    /// Open a window when clicked
    #[must_use]
    pub fn opens_window(mut self, window: MockWindow) -> Self {
        self.opens = Some(Box::new(window));
        self
    }
}

/// Mutable state shared by clones of a [`MockSession`]
#[derive(Debug, Clone, Default)]
pub struct MockState {
    /// Windows in enumeration order
    pub windows: Vec<MockWindow>,
    /// Active window
    pub active: Option<WindowHandle>,
    /// Handle listings so far
    pub listings: u32,
    /// Element lookups so far
    pub lookups: u32,
    /// Call history for verification
    pub calls: Vec<String>,
    /// `(locator, text)` pairs typed so far
    pub typed: Vec<(String, String)>,
    /// Screenshot data
    pub screenshot: Option<Vec<u8>>,
    /// Whether `quit` was called
    pub quit: bool,
}

impl MockState {
    // before the first listing the session behaves as if it had listed once
    fn listed(&self) -> impl Iterator<Item = &MockWindow> {
        let listings = self.listings.max(1);
        self.windows.iter().filter(move |w| w.opens_after < listings)
    }

    fn active_window(&self) -> HarnessResult<&MockWindow> {
        let handle = self
            .active
            .as_ref()
            .ok_or_else(|| HarnessError::session("no active window"))?;
        self.windows
            .iter()
            .find(|w| &w.handle == handle)
            .ok_or_else(|| HarnessError::session(format!("no such window: {handle}")))
    }

    fn element(&self, element: &ElementHandle) -> HarnessResult<&MockElement> {
        let stale = || HarnessError::StaleElement {
            id: element.id.clone(),
        };
        let (handle, index) = element.id.rsplit_once('#').ok_or_else(stale)?;
        let index: usize = index.parse().map_err(|_| stale())?;
        self.windows
            .iter()
            .find(|w| w.handle.as_str() == handle)
            .and_then(|w| w.elements.get(index))
            .ok_or_else(stale)
    }
}

/// Mock session for unit testing
///
/// Clones share state, so a test can keep a clone to inspect what a world
/// did with the session it was handed.
#[derive(Debug, Clone, Default)]
pub struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    /// Create an empty session (no windows)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a window; the first window added becomes active
    #[must_use]
    pub fn with_window(self, window: MockWindow) -> Self {
        self.open_window(window);
        {
            let mut state = self.lock();
            if state.active.is_none() {
                state.active = state.windows.first().map(|w| w.handle.clone());
            }
        }
        self
    }

    /// Set screenshot bytes
    #[must_use]
    pub fn with_screenshot(self, data: Vec<u8>) -> Self {
        self.lock().screenshot = Some(data);
        self
    }

    /// Independent copy with the same scripted state
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            state: Arc::new(Mutex::new(self.lock().clone())),
        }
    }

    /// Open a window now, as the application would
    pub fn open_window(&self, window: MockWindow) {
        self.lock().windows.push(window);
    }

    /// Close a window now; its handle goes stale
    pub fn close_window(&self, handle: &WindowHandle) {
        self.lock().windows.retain(|w| &w.handle != handle);
    }

    /// Currently active handle
    #[must_use]
    pub fn active_handle(&self) -> Option<WindowHandle> {
        self.lock().active.clone()
    }

    /// Get call history
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().calls.iter().any(|c| c.starts_with(method))
    }

    /// Number of handle listings so far
    #[must_use]
    pub fn listings(&self) -> u32 {
        self.lock().listings
    }

    /// Text typed so far
    #[must_use]
    pub fn typed(&self) -> Vec<(String, String)> {
        self.lock().typed.clone()
    }

    /// Whether the session was ended
    #[must_use]
    pub fn is_quit(&self) -> bool {
        self.lock().quit
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // a poisoned lock only means another test thread panicked
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn window_handles(&self) -> HarnessResult<Vec<WindowHandle>> {
        let mut state = self.lock();
        state.calls.push("window_handles".to_string());
        state.listings += 1;
        Ok(state.listed().map(|w| w.handle.clone()).collect())
    }

    async fn active_window(&self) -> HarnessResult<WindowHandle> {
        let mut state = self.lock();
        state.calls.push("active_window".to_string());
        state
            .active
            .clone()
            .ok_or_else(|| HarnessError::session("no active window"))
    }

    async fn switch_to_window(&mut self, handle: &WindowHandle) -> HarnessResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("switch_to_window:{handle}"));
        let usable = state
            .listed()
            .any(|w| &w.handle == handle && w.fault != Some(MockFault::StaleOnSwitch));
        if !usable {
            return Err(HarnessError::session(format!("no such window: {handle}")));
        }
        state.active = Some(handle.clone());
        Ok(())
    }

    async fn title(&self) -> HarnessResult<String> {
        let mut state = self.lock();
        state.calls.push("title".to_string());
        let window = state.active_window()?;
        if window.fault == Some(MockFault::GoneOnTitle) {
            return Err(HarnessError::session(format!(
                "window {} is gone",
                window.handle
            )));
        }
        Ok(window.title.clone())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        let mut state = self.lock();
        state.calls.push("current_url".to_string());
        Ok(state.active_window()?.url.clone())
    }

    async fn navigate(&mut self, url: &str) -> HarnessResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("navigate:{url}"));
        let handle = state.active_window()?.handle.clone();
        if let Some(window) = state.windows.iter_mut().find(|w| w.handle == handle) {
            window.url = url.to_string();
        }
        Ok(())
    }

    async fn find_elements(
        &self,
        locator: &Locator,
        parent: Option<&ElementHandle>,
    ) -> HarnessResult<Vec<ElementHandle>> {
        let mut state = self.lock();
        state.calls.push(format!("find_elements:{locator}"));
        state.lookups += 1;
        if let Some(parent) = parent {
            state.element(parent)?;
        }
        let lookups = state.lookups;
        let window = state.active_window()?;
        Ok(window
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| &e.locator == locator && e.found_after < lookups)
            .filter(|(_, e)| match parent {
                Some(p) => e.parent.as_ref() == Some(&p.locator),
                None => true,
            })
            .map(|(i, e)| ElementHandle::new(format!("{}#{i}", window.handle), e.locator.clone()))
            .collect())
    }

    async fn click(&self, element: &ElementHandle) -> HarnessResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("click:{}", element.locator));
        let found = state.element(element)?;
        if !found.displayed {
            return Err(HarnessError::Interaction {
                message: format!("element {} is not interactable", element.locator),
            });
        }
        if let Some(window) = found.opens.clone() {
            state.windows.push(*window);
        }
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> HarnessResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("type_text:{}", element.locator));
        state.element(element)?;
        state
            .typed
            .push((element.locator.to_string(), text.to_string()));
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> HarnessResult<String> {
        let state = self.lock();
        Ok(state.element(element)?.text.clone())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> HarnessResult<bool> {
        let state = self.lock();
        Ok(state.element(element)?.displayed)
    }

    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        let mut state = self.lock();
        state.calls.push("screenshot".to_string());
        Ok(state
            .screenshot
            .clone()
            .unwrap_or_else(|| MOCK_PNG.to_vec()))
    }

    async fn quit(&mut self) -> HarnessResult<()> {
        let mut state = self.lock();
        state.calls.push("quit".to_string());
        state.quit = true;
        Ok(())
    }
}

/// Hands every scenario a fresh fork of a template session
#[derive(Debug, Clone, Default)]
pub struct MockSessionFactory {
    template: MockSession,
    opened: Arc<Mutex<Vec<(Capabilities, MockSession)>>>,
    fail_with: Option<String>,
}

impl MockSessionFactory {
    /// Create a factory from a template
    #[must_use]
    pub fn new(template: MockSession) -> Self {
        Self {
            template,
            opened: Arc::default(),
            fail_with: None,
        }
    }

    /// Make every `open` fail, as an unreachable driver would
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    /// Sessions opened so far, with the capabilities they were opened with
    #[must_use]
    pub fn opened(&self) -> Vec<(Capabilities, MockSession)> {
        self.opened
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    async fn open(
        &self,
        config: &Config,
        capabilities: &Capabilities,
    ) -> HarnessResult<Box<dyn BrowserSession>> {
        if let Some(message) = &self.fail_with {
            return Err(HarnessError::ConnectionFailed {
                url: config.driver_url.clone(),
                message: message.clone(),
            });
        }
        let session = self.template.fork();
        self.opened
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((capabilities.clone(), session.clone()));
        Ok(Box::new(session))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn two_windows() -> MockSession {
        MockSession::new()
            .with_window(MockWindow::new("h1", "Main"))
            .with_window(MockWindow::new("h2", "Popup Window"))
    }

    #[tokio::test]
    async fn test_first_window_is_active() {
        let session = two_windows();
        assert_eq!(session.active_handle(), Some(WindowHandle::new("h1")));
        assert_eq!(session.title().await.unwrap(), "Main");
    }

    #[tokio::test]
    async fn test_switch_and_title() {
        let mut session = two_windows();
        session.window_handles().await.unwrap();
        session
            .switch_to_window(&WindowHandle::new("h2"))
            .await
            .unwrap();
        assert_eq!(session.title().await.unwrap(), "Popup Window");
    }

    #[tokio::test]
    async fn test_stale_window_cannot_be_switched_to() {
        let mut session = MockSession::new()
            .with_window(MockWindow::new("h1", "Main").with_fault(MockFault::StaleOnSwitch));
        let handles = session.window_handles().await.unwrap();
        assert_eq!(handles.len(), 1);
        assert!(session.switch_to_window(&handles[0]).await.is_err());
    }

    #[tokio::test]
    async fn test_window_opening_after_listings() {
        let session = MockSession::new()
            .with_window(MockWindow::new("h1", "Main"))
            .with_window(MockWindow::new("h2", "Later").opening_after(2));
        assert_eq!(session.window_handles().await.unwrap().len(), 1);
        assert_eq!(session.window_handles().await.unwrap().len(), 1);
        assert_eq!(session.window_handles().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_click_opens_window() {
        let button = Locator::id("open");
        let session = MockSession::new().with_window(
            MockWindow::new("h1", "Main").with_element(
                MockElement::new(button.clone(), "Open").opens_window(MockWindow::new("h2", "Popup")),
            ),
        );
        let found = session.find_elements(&button, None).await.unwrap();
        session.click(&found[0]).await.unwrap();
        assert_eq!(session.window_handles().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_hidden_element_is_not_clickable() {
        let locator = Locator::css(".ghost");
        let session = MockSession::new().with_window(
            MockWindow::new("h1", "Main").with_element(MockElement::new(locator.clone(), "").hidden()),
        );
        let found = session.find_elements(&locator, None).await.unwrap();
        assert!(!session.is_displayed(&found[0]).await.unwrap());
        assert!(matches!(
            session.click(&found[0]).await,
            Err(HarnessError::Interaction { .. })
        ));
    }

    #[tokio::test]
    async fn test_nested_lookup() {
        let form = Locator::css("form");
        let input = Locator::css("input");
        let session = MockSession::new().with_window(
            MockWindow::new("h1", "Main")
                .with_element(MockElement::new(form.clone(), ""))
                .with_element(MockElement::new(input.clone(), "").inside(form.clone()))
                .with_element(MockElement::new(input.clone(), "")),
        );
        let forms = session.find_elements(&form, None).await.unwrap();
        assert_eq!(session.find_elements(&input, None).await.unwrap().len(), 2);
        assert_eq!(
            session
                .find_elements(&input, Some(&forms[0]))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_closed_window_elements_go_stale() {
        let locator = Locator::id("x");
        let session = MockSession::new()
            .with_window(MockWindow::new("h1", "Main").with_element(MockElement::new(locator.clone(), "x")));
        let found = session.find_elements(&locator, None).await.unwrap();
        session.close_window(&WindowHandle::new("h1"));
        assert!(matches!(
            session.text(&found[0]).await,
            Err(HarnessError::StaleElement { .. })
        ));
    }

    #[tokio::test]
    async fn test_factory_forks_template() {
        let factory = MockSessionFactory::new(two_windows());
        let config = Config::default();
        let caps = Capabilities::for_session(&config, "a");
        let mut first = factory.open(&config, &caps).await.unwrap();
        first.quit().await.unwrap();
        let _second = factory.open(&config, &caps).await.unwrap();

        let opened = factory.opened();
        assert_eq!(opened.len(), 2);
        assert!(opened[0].1.is_quit());
        assert!(!opened[1].1.is_quit());
    }

    #[tokio::test]
    async fn test_failing_factory() {
        let factory = MockSessionFactory::failing("connection refused");
        let config = Config::default();
        let caps = Capabilities::for_session(&config, "a");
        assert!(matches!(
            factory.open(&config, &caps).await,
            Err(HarnessError::ConnectionFailed { .. })
        ));
    }
}
