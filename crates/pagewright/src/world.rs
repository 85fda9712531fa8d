//! Per-scenario execution context.
//!
//! Cucumber builds one [`BrowserWorld`] per scenario. The before-hook hands
//! it the shared [`Harness`] and opens the browser session; steps then drive
//! the browser through the world's operations.

use crate::config::Config;
use crate::locator::Locator;
use crate::page_object::PageRegistry;
use crate::registry::Registries;
use crate::result::{HarnessError, HarnessResult};
use crate::session::{BrowserSession, Capabilities, ElementHandle, SessionFactory, WindowHandle};
use crate::wait::{self, WaitCondition, WaitOptions, WaitOutcome};
use crate::window::{self, WindowRegistry};
use cucumber::World;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// =============================================================================
// HARNESS
// =============================================================================

/// Everything a run shares between scenarios
#[derive(Debug, Clone)]
pub struct Harness {
    /// Resolved configuration
    pub config: Config,
    /// Page objects
    pub pages: PageRegistry,
    /// Windows
    pub windows: WindowRegistry,
    factory: Arc<dyn SessionFactory>,
}

impl Harness {
    /// Harness with empty registries
    #[must_use]
    pub fn new(config: Config, factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            config,
            pages: PageRegistry::new(),
            windows: WindowRegistry::new(),
            factory,
        }
    }

    /// Set the page registry
    #[must_use]
    pub fn with_pages(mut self, pages: PageRegistry) -> Self {
        self.pages = pages;
        self
    }

    /// Set the window registry
    #[must_use]
    pub fn with_windows(mut self, windows: WindowRegistry) -> Self {
        self.windows = windows;
        self
    }

    /// Set both registries
    #[must_use]
    pub fn with_registries(self, registries: Registries) -> Self {
        self.with_pages(registries.pages)
            .with_windows(registries.windows)
    }

    /// Session factory
    #[must_use]
    pub fn factory(&self) -> &dyn SessionFactory {
        self.factory.as_ref()
    }
}

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// Media type of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// `text/plain`
    TextPlain,
    /// `image/png`
    ImagePng,
    /// `application/json`
    ApplicationJson,
}

impl MediaType {
    /// MIME string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TextPlain => "text/plain",
            Self::ImagePng => "image/png",
            Self::ApplicationJson => "application/json",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data attached to a scenario's report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Media type
    pub media_type: MediaType,
    /// Raw bytes
    pub data: Vec<u8>,
    /// File the data was also written to
    pub path: Option<PathBuf>,
}

impl Attachment {
    /// Data as text, for text and json attachments
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self.media_type {
            MediaType::TextPlain | MediaType::ApplicationJson => {
                std::str::from_utf8(&self.data).ok()
            }
            MediaType::ImagePng => None,
        }
    }
}

// =============================================================================
// WORLD
// =============================================================================

/// Per-scenario state passed to every step
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct BrowserWorld {
    harness: Option<Arc<Harness>>,
    session: Option<Box<dyn BrowserSession>>,
    scenario: String,
    scenario_id: Uuid,
    timeout_override: Option<u64>,
    attachments: Vec<Attachment>,
}

impl BrowserWorld {
    /// Create an unstarted world
    pub async fn new() -> Self {
        Self {
            harness: None,
            session: None,
            scenario: String::new(),
            scenario_id: Uuid::new_v4(),
            timeout_override: None,
            attachments: Vec::new(),
        }
    }

    /// Open the scenario's browser session; no-op when already open
    pub async fn start(&mut self, harness: Arc<Harness>, scenario: &str) -> HarnessResult<()> {
        if self.session.is_some() {
            return Ok(());
        }
        let capabilities = Capabilities::for_session(&harness.config, scenario);
        let session = harness
            .factory()
            .open(&harness.config, &capabilities)
            .await?;
        tracing::info!(
            scenario,
            id = %self.scenario_id,
            browser = %capabilities.describe(),
            "scenario started"
        );
        self.scenario = scenario.to_string();
        self.harness = Some(harness);
        self.session = Some(session);
        Ok(())
    }

    /// Quit the session; no-op without one
    pub async fn stop(&mut self) -> HarnessResult<()> {
        if let Some(mut session) = self.session.take() {
            session.quit().await?;
            tracing::info!(scenario = %self.scenario, id = %self.scenario_id, "scenario finished");
        }
        Ok(())
    }

    /// Whether a session is open
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.session.is_some()
    }

    /// Name of the running scenario
    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// The shared harness
    pub fn harness(&self) -> HarnessResult<&Harness> {
        self.harness.as_deref().ok_or_else(not_started)
    }

    fn shared(&self) -> HarnessResult<Arc<Harness>> {
        self.harness.clone().ok_or_else(not_started)
    }

    /// The open session
    pub fn session(&self) -> HarnessResult<&dyn BrowserSession> {
        self.session.as_deref().ok_or_else(not_started)
    }

    fn session_mut(&mut self) -> HarnessResult<&mut dyn BrowserSession> {
        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(not_started()),
        }
    }

    /// Override the window timeout for the rest of the scenario
    pub fn set_default_timeout(&mut self, ms: u64) {
        self.timeout_override = Some(ms);
    }

    /// Window timeout in force: the scenario override, else the config default
    pub fn window_timeout(&self) -> HarnessResult<Option<Duration>> {
        match self.timeout_override {
            Some(ms) => Ok(Some(Duration::from_millis(ms))),
            None => Ok(self.harness()?.config.default_timeout()),
        }
    }

    // -------------------------------------------------------------------------
    // navigation and elements
    // -------------------------------------------------------------------------

    /// Navigate to `url`; relative paths are resolved against the base URL
    pub async fn navigate(&mut self, url: &str) -> HarnessResult<()> {
        let url = self.harness()?.config.resolve_url(url);
        tracing::debug!(%url, "navigate");
        self.session_mut()?.navigate(&url).await
    }

    /// Navigate to a registered page
    pub async fn open_page(&mut self, page: &str) -> HarnessResult<()> {
        let harness = self.shared()?;
        let path = harness.pages.get(page)?.path().ok_or_else(|| {
            HarnessError::config(format!("page {page:?} has no path to open"))
        })?;
        self.navigate(path).await
    }

    /// All elements matching `locator`, optionally below `parent`
    pub async fn get_elements(
        &self,
        locator: &Locator,
        parent: Option<&ElementHandle>,
    ) -> HarnessResult<Vec<ElementHandle>> {
        self.session()?.find_elements(locator, parent).await
    }

    /// Wait with the element timeout
    pub async fn wait_for(&self, condition: &WaitCondition) -> HarnessResult<WaitOutcome> {
        let options = WaitOptions::for_elements(&self.harness()?.config);
        wait::wait_for(self.session()?, condition, &options).await
    }

    async fn first(&self, condition: WaitCondition) -> HarnessResult<ElementHandle> {
        let locator = match &condition {
            WaitCondition::Located(l) | WaitCondition::Visible(l) => l.to_string(),
            other => other.to_string(),
        };
        self.wait_for(&condition)
            .await?
            .elements
            .into_iter()
            .next()
            .ok_or(HarnessError::ElementNotFound { locator })
    }

    /// Wait until a page element is located
    pub async fn element(&self, page: &str, element: &str) -> HarnessResult<ElementHandle> {
        let locator = self.harness()?.pages.locator(page, element)?.clone();
        self.first(WaitCondition::Located(locator)).await
    }

    /// Wait until a page element is visible, then click it
    pub async fn click(&self, page: &str, element: &str) -> HarnessResult<()> {
        let locator = self.harness()?.pages.locator(page, element)?.clone();
        let target = self.first(WaitCondition::Visible(locator)).await?;
        self.session()?.click(&target).await
    }

    /// Wait until a page element is visible, then type into it
    pub async fn type_into(&self, page: &str, element: &str, text: &str) -> HarnessResult<()> {
        let locator = self.harness()?.pages.locator(page, element)?.clone();
        let target = self.first(WaitCondition::Visible(locator)).await?;
        self.session()?.type_text(&target, text).await
    }

    // -------------------------------------------------------------------------
    // windows
    // -------------------------------------------------------------------------

    /// Make the registered window active
    pub async fn switch_to_window(&mut self, name: &str) -> HarnessResult<WindowHandle> {
        let harness = self.shared()?;
        let timeout = self.window_timeout()?;
        let handle =
            window::switch_to_window(self.session_mut()?, &harness.windows, name, timeout).await?;
        Ok(handle)
    }

    /// Whether the registered window is open; the active window is kept
    pub async fn is_window_open(&mut self, name: &str) -> HarnessResult<bool> {
        let harness = self.shared()?;
        let timeout = self.window_timeout()?;
        let open =
            window::is_window_open(self.session_mut()?, &harness.windows, name, timeout).await?;
        Ok(open)
    }

    // -------------------------------------------------------------------------
    // page assertions
    // -------------------------------------------------------------------------

    /// Every initially loaded element of the page is present in the DOM
    pub async fn are_all_elements_visible(&self, page: &str) -> HarnessResult<()> {
        let harness = self.shared()?;
        for element in harness.pages.get(page)?.initially_loaded() {
            match self.wait_for(&WaitCondition::Located(element.by.clone())).await {
                Ok(_) => {}
                Err(HarnessError::Timeout { .. }) => {
                    return Err(HarnessError::assertion(format!(
                        "{page} - The {} element is not displayed correctly!",
                        element.name
                    )))
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// The current URL belongs to the page and its initial elements are present
    pub async fn is_displayed_correctly(&self, page: &str) -> HarnessResult<()> {
        let harness = self.shared()?;
        if let Some(pattern) = harness.pages.get(page)?.url_pattern() {
            let condition = WaitCondition::UrlMatches(pattern.clone());
            if let Err(e) = self.wait_for(&condition).await {
                let url = self.session()?.current_url().await.unwrap_or_default();
                return Err(match e {
                    HarnessError::Timeout { .. } => HarnessError::assertion(format!(
                        "{page} - The current url {url} does not match /{pattern}/"
                    )),
                    other => other,
                });
            }
        }
        self.are_all_elements_visible(page).await
    }

    // -------------------------------------------------------------------------
    // screenshots and attachments
    // -------------------------------------------------------------------------

    /// Capture the active window, write it under the screenshot directory
    /// and attach it
    pub async fn take_screenshot(&mut self) -> HarnessResult<PathBuf> {
        let data = self.session()?.screenshot().await?;
        let dir = self.harness()?.config.screenshot_dir.clone();
        tokio::fs::create_dir_all(&dir).await?;

        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
        let path = dir.join(format!("{}-{stamp}.png", slug(&self.scenario)));
        tokio::fs::write(&path, &data).await?;
        tracing::info!(path = %path.display(), "screenshot saved");

        self.attachments.push(Attachment {
            media_type: MediaType::ImagePng,
            data,
            path: Some(path.clone()),
        });
        Ok(path)
    }

    /// Attach raw data
    pub fn attach(&mut self, data: Vec<u8>, media_type: MediaType) {
        self.attachments.push(Attachment {
            media_type,
            data,
            path: None,
        });
    }

    /// Attach text
    pub fn attach_text(&mut self, text: impl Into<String>) {
        self.attach(text.into().into_bytes(), MediaType::TextPlain);
    }

    /// Attach a value as pretty JSON
    pub fn attach_json<T: Serialize>(&mut self, value: &T) -> HarnessResult<()> {
        let data = serde_json::to_vec_pretty(value)?;
        self.attach(data, MediaType::ApplicationJson);
        Ok(())
    }

    /// Attachments so far
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

fn not_started() -> HarnessError {
    HarnessError::NoSession {
        message: "the scenario has not been started".to_string(),
    }
}

/// File-name friendly form of a scenario name
fn slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "scenario".to_string()
    } else {
        slug.to_string()
    }
}
