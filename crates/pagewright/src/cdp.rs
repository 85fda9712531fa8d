//! Browser control over the Chrome `DevTools` Protocol.
//!
//! [`CdpSessionFactory`] connects to a running browser's debugging endpoint
//! (`driver_url`, e.g. `http://localhost:9222`) with chromiumoxide. Each
//! session owns a fresh browser context: its windows, cookies and storage
//! are invisible to other sessions and disappear on [`quit`](BrowserSession::quit).
//! Window handles are CDP target ids; element handles are backend node ids
//! into a table of chromiumoxide elements owned by the session.

use crate::config::Config;
use crate::locator::{Locator, Query};
use crate::result::{HarnessError, HarnessResult};
use crate::session::{BrowserSession, Capabilities, ElementHandle, SessionFactory, WindowHandle};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::cdp::browser_protocol::security::SetIgnoreCertificateErrorsParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, TargetInfo,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const IS_DISPLAYED_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    const s = window.getComputedStyle(this); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; \
}";

fn session_error(e: impl std::fmt::Display) -> HarnessError {
    HarnessError::session(e.to_string())
}

/// Connects one CDP session per scenario
#[derive(Debug, Clone, Copy, Default)]
pub struct CdpSessionFactory;

impl CdpSessionFactory {
    /// Create a factory
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionFactory for CdpSessionFactory {
    async fn open(
        &self,
        config: &Config,
        capabilities: &Capabilities,
    ) -> HarnessResult<Box<dyn BrowserSession>> {
        let session = CdpSession::connect(config, capabilities).await?;
        Ok(Box::new(session))
    }
}

/// A scenario's connection to a remote browser
#[derive(Debug)]
pub struct CdpSession {
    browser: Mutex<Browser>,
    handler: tokio::task::JoinHandle<()>,
    context: BrowserContextId,
    active: Mutex<Page>,
    elements: Mutex<HashMap<String, Arc<Element>>>,
}

impl CdpSession {
    /// Connect to `config.driver_url` and open a first window
    pub async fn connect(config: &Config, capabilities: &Capabilities) -> HarnessResult<Self> {
        let connection_failed = |e: chromiumoxide::error::CdpError| HarnessError::ConnectionFailed {
            url: config.driver_url.clone(),
            message: e.to_string(),
        };
        let (mut browser, mut handler) = Browser::connect(config.driver_url.clone())
            .await
            .map_err(connection_failed)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let version = browser.version().await.map_err(connection_failed)?;
        check_product(capabilities, &version.product)?;

        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(session_error)?;
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(HarnessError::session)?;
        let page = browser.new_page(target).await.map_err(session_error)?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(capabilities.window_width),
            i64::from(capabilities.window_height),
            1.0,
            false,
        ))
        .await
        .map_err(session_error)?;
        if capabilities.accept_insecure_certs {
            page.execute(SetIgnoreCertificateErrorsParams::new(true))
                .await
                .map_err(session_error)?;
        }

        tracing::info!(
            session = %capabilities.session_name,
            product = %version.product,
            context = %context.inner(),
            url = %config.driver_url,
            "browser session opened"
        );
        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            context,
            active: Mutex::new(page),
            elements: Mutex::new(HashMap::new()),
        })
    }

    async fn page(&self) -> Page {
        self.active.lock().await.clone()
    }

    async fn element(&self, handle: &ElementHandle) -> HarnessResult<Arc<Element>> {
        self.elements
            .lock()
            .await
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| HarnessError::StaleElement {
                id: handle.id.clone(),
            })
    }

    /// Repeated lookups of the same node reuse its entry
    async fn remember(&self, found: Vec<Element>, locator: &Locator) -> Vec<ElementHandle> {
        let mut elements = self.elements.lock().await;
        found
            .into_iter()
            .map(|element| {
                let id = element_key(*element.backend_node_id.inner());
                let _ = elements.insert(id.clone(), Arc::new(element));
                ElementHandle::new(id, locator.clone())
            })
            .collect()
    }
}

fn element_key(backend_node_id: i64) -> String {
    format!("node-{backend_node_id}")
}

/// Page targets belonging to `context`, in the order the browser lists them
fn context_pages<'a, I>(targets: I, context: &str) -> Vec<WindowHandle>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>, &'a str)>,
{
    targets
        .into_iter()
        .filter(|(kind, ctx, _)| *kind == "page" && *ctx == Some(context))
        .map(|(_, _, id)| WindowHandle::new(id))
        .collect()
}

fn target_fields(target: &TargetInfo) -> (&str, Option<&str>, &str) {
    (
        target.r#type.as_str(),
        target.browser_context_id.as_ref().map(|c| c.inner().as_str()),
        target.target_id.inner().as_str(),
    )
}

/// Fail when the endpoint runs another browser than the one requested
fn check_product(capabilities: &Capabilities, product: &str) -> HarnessResult<()> {
    let mismatch = || HarnessError::BrowserMismatch {
        expected: capabilities.describe(),
        actual: product.to_string(),
    };
    if !capabilities.browser_name.matches_product(product) {
        return Err(mismatch());
    }
    if let Some(expected) = &capabilities.browser_version {
        let actual = product.split_once('/').map_or("", |(_, v)| v);
        if !actual.starts_with(expected.as_str()) {
            return Err(mismatch());
        }
    }
    Ok(())
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn window_handles(&self) -> HarnessResult<Vec<WindowHandle>> {
        let targets = self
            .browser
            .lock()
            .await
            .fetch_targets()
            .await
            .map_err(session_error)?;
        Ok(context_pages(
            targets.iter().map(target_fields),
            self.context.inner(),
        ))
    }

    async fn active_window(&self) -> HarnessResult<WindowHandle> {
        Ok(WindowHandle::new(
            self.active.lock().await.target_id().inner().clone(),
        ))
    }

    async fn switch_to_window(&mut self, handle: &WindowHandle) -> HarnessResult<()> {
        let pages = self.browser.lock().await.pages().await.map_err(session_error)?;
        let page = pages
            .into_iter()
            .find(|p| p.target_id().inner() == handle.as_str())
            .ok_or_else(|| HarnessError::session(format!("no such window: {handle}")))?;
        page.bring_to_front().await.map_err(session_error)?;
        *self.active.lock().await = page;
        Ok(())
    }

    async fn title(&self) -> HarnessResult<String> {
        let title = self.page().await.get_title().await.map_err(session_error)?;
        Ok(title.unwrap_or_default())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        let url = self.page().await.url().await.map_err(session_error)?;
        Ok(url.unwrap_or_default())
    }

    async fn navigate(&mut self, url: &str) -> HarnessResult<()> {
        self.page()
            .await
            .goto(url)
            .await
            .map_err(|e| HarnessError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn find_elements(
        &self,
        locator: &Locator,
        parent: Option<&ElementHandle>,
    ) -> HarnessResult<Vec<ElementHandle>> {
        let found = match (locator.query(), parent) {
            (Query::Css(css), None) => self.page().await.find_elements(css).await,
            (Query::XPath(xpath), None) => self.page().await.find_xpaths(xpath).await,
            (Query::Css(css), Some(parent)) => self.element(parent).await?.find_elements(css).await,
            (Query::XPath(_), Some(_)) => {
                return Err(HarnessError::InvalidLocator {
                    locator: locator.to_string(),
                    message: "xpath lookups below an element are not supported".to_string(),
                })
            }
        };
        // CDP reports a missing node as an error; callers expect an empty list
        let found = match found {
            Ok(found) => found,
            Err(e) => {
                tracing::trace!(%locator, error = %e, "lookup found nothing");
                Vec::new()
            }
        };
        Ok(self.remember(found, locator).await)
    }

    async fn click(&self, element: &ElementHandle) -> HarnessResult<()> {
        self.element(element)
            .await?
            .click()
            .await
            .map_err(|e| HarnessError::Interaction {
                message: format!("click on {}: {e}", element.locator),
            })?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> HarnessResult<()> {
        let target = self.element(element).await?;
        target
            .click()
            .await
            .map_err(|e| HarnessError::Interaction {
                message: format!("focus {}: {e}", element.locator),
            })?;
        target
            .type_str(text)
            .await
            .map_err(|e| HarnessError::Interaction {
                message: format!("typing into {}: {e}", element.locator),
            })?;
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> HarnessResult<String> {
        let text = self
            .element(element)
            .await?
            .inner_text()
            .await
            .map_err(session_error)?;
        Ok(text.unwrap_or_default())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> HarnessResult<bool> {
        let returns = self
            .element(element)
            .await?
            .call_js_fn(IS_DISPLAYED_JS, false)
            .await
            .map_err(session_error)?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let screenshot = self
            .page()
            .await
            .execute(params)
            .await
            .map_err(|e| HarnessError::Screenshot {
                message: e.to_string(),
            })?;

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|e| HarnessError::Screenshot {
                message: e.to_string(),
            })
    }

    async fn quit(&mut self) -> HarnessResult<()> {
        self.elements.lock().await.clear();
        // disposing the context closes every window it owns and nothing else
        let disposed = self
            .browser
            .lock()
            .await
            .dispose_browser_context(self.context.clone())
            .await;
        self.handler.abort();
        disposed.map_err(session_error)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::BrowserName;

    fn capabilities(browser: BrowserName, version: Option<&str>) -> Capabilities {
        let mut config = Config::default().with_browser(browser);
        config.browser_version = version.map(ToString::to_string);
        Capabilities::for_session(&config, "s")
    }

    #[test]
    fn test_context_pages_skip_other_contexts() {
        let targets = [
            ("page", None, "user-tab"),
            ("page", Some("ctx-a"), "a-main"),
            ("service_worker", Some("ctx-a"), "a-worker"),
            ("page", Some("ctx-b"), "b-main"),
            ("page", Some("ctx-a"), "a-popup"),
        ];
        let handles = context_pages(targets, "ctx-a");
        assert_eq!(
            handles,
            vec![WindowHandle::new("a-main"), WindowHandle::new("a-popup")]
        );
    }

    #[test]
    fn test_element_key_is_stable_per_node() {
        assert_eq!(element_key(42), element_key(42));
        assert_ne!(element_key(42), element_key(43));
    }

    #[test]
    fn test_product_matches_browser() {
        let caps = capabilities(BrowserName::Chrome, None);
        assert!(check_product(&caps, "HeadlessChrome/120.0.6099.109").is_ok());
        assert!(matches!(
            check_product(&caps, "Firefox/121.0"),
            Err(HarnessError::BrowserMismatch { .. })
        ));
    }

    #[test]
    fn test_product_version_prefix() {
        let caps = capabilities(BrowserName::Chrome, Some("120"));
        assert!(check_product(&caps, "Chrome/120.0.6099.109").is_ok());
        let err = check_product(&caps, "Chrome/119.0.1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Browser mismatch: expected chrome 120, driver reports Chrome/119.0.1"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let config = Config::default().with_driver_url("http://127.0.0.1:1");
        let caps = Capabilities::for_session(&config, "s");
        assert!(matches!(
            CdpSessionFactory::new().open(&config, &caps).await,
            Err(HarnessError::ConnectionFailed { .. })
        ));
    }
}
