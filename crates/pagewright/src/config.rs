//! Run configuration
//!
//! Configuration is assembled field by field from three layers, each one
//! overriding the previous:
//!
//! 1. built-in defaults
//! 2. the JSON config file (`./e2econfig.json` unless told otherwise)
//! 3. environment variables
//!
//! A missing or unreadable config file contributes nothing.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "e2econfig.json";

/// Default remote driver endpoint (CDP HTTP endpoint of a remote browser)
pub const DEFAULT_DRIVER_URL: &str = "http://localhost:9222";

/// Default budget for element waits
pub const DEFAULT_ELEMENT_TIMEOUT_MS: u64 = 10_000;

/// Default directory for failure screenshots
pub const DEFAULT_SCREENSHOT_DIR: &str = "target/pagewright/screenshots";

/// Environment variables read by [`Config::load`]
pub mod env {
    /// Browser name (`chrome` or `firefox`)
    pub const BROWSER_NAME: &str = "BROWSER_NAME";
    /// Expected browser version prefix
    pub const BROWSER_VERSION: &str = "BROWSER_VERSION";
    /// Remote driver URL
    pub const DRIVER_URL: &str = "DRIVER_URL";
    /// Legacy name for the remote driver URL
    pub const SELENIUM_URL: &str = "SELENIUM_URL";
    /// Window switch budget in milliseconds
    pub const DEFAULT_TIMEOUT: &str = "DEFAULT_TIMEOUT";
    /// Element wait budget in milliseconds
    pub const ELEMENT_TIMEOUT: &str = "ELEMENT_TIMEOUT";
    /// Base URL prepended to page paths
    pub const BASE_URL: &str = "BASE_URL";
    /// Screenshot output directory
    pub const SCREENSHOT_DIR: &str = "SCREENSHOT_DIR";
}

/// Browsers the harness can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserName {
    /// Chrome / Chromium
    #[default]
    Chrome,
    /// Firefox
    Firefox,
}

impl BrowserName {
    /// Lowercase name as used in config files and capabilities
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
        }
    }

    /// Whether a driver-reported product string (e.g. `HeadlessChrome/120.0`)
    /// belongs to this browser
    #[must_use]
    pub fn matches_product(&self, product: &str) -> bool {
        let product = product.to_ascii_lowercase();
        match self {
            Self::Chrome => product.contains("chrome") || product.contains("chromium"),
            Self::Firefox => product.contains("firefox"),
        }
    }
}

impl fmt::Display for BrowserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserName {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(Self::Chrome),
            "firefox" => Ok(Self::Firefox),
            other => Err(HarnessError::UnsupportedBrowser {
                name: other.to_string(),
            }),
        }
    }
}

/// The global end-to-end run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Browser to drive
    pub browser_name: BrowserName,
    /// Expected browser version prefix (None = any)
    pub browser_version: Option<String>,
    /// Remote driver endpoint
    pub driver_url: String,
    /// Total window switch budget in milliseconds (None or 0 = single pass)
    pub default_timeout: Option<u64>,
    /// Element wait budget in milliseconds
    pub element_timeout: u64,
    /// Base URL that page paths are joined onto
    pub base_url: Option<String>,
    /// Where failure screenshots are written
    pub screenshot_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_name: BrowserName::Chrome,
            browser_version: None,
            driver_url: DEFAULT_DRIVER_URL.to_string(),
            default_timeout: None,
            element_timeout: DEFAULT_ELEMENT_TIMEOUT_MS,
            base_url: None,
            screenshot_dir: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
        }
    }
}

impl Config {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load defaults, then `./e2econfig.json`, then the process environment
    pub fn load() -> HarnessResult<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load defaults, then the given file, then the process environment
    pub fn load_from(path: &Path) -> HarnessResult<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load with an explicit environment lookup
    pub fn load_with<F>(path: &Path, lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply(ConfigLayer::from_file(path))?;
        config.apply(ConfigLayer::from_env(lookup)?)?;
        tracing::debug!(
            browser = %config.browser_name,
            driver_url = %config.driver_url,
            default_timeout = ?config.default_timeout,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Override every field the layer sets
    pub fn apply(&mut self, layer: ConfigLayer) -> HarnessResult<()> {
        if let Some(name) = layer.browser_name {
            self.browser_name = name.parse()?;
        }
        if let Some(version) = layer.browser_version {
            self.browser_version = Some(version);
        }
        if let Some(url) = layer.driver_url {
            self.driver_url = url;
        }
        if let Some(ms) = layer.default_timeout {
            self.default_timeout = Some(ms);
        }
        if let Some(ms) = layer.element_timeout {
            self.element_timeout = ms;
        }
        if let Some(url) = layer.base_url {
            self.base_url = Some(url);
        }
        if let Some(dir) = layer.screenshot_dir {
            self.screenshot_dir = dir;
        }
        Ok(())
    }

    /// Set browser
    #[must_use]
    pub const fn with_browser(mut self, browser: BrowserName) -> Self {
        self.browser_name = browser;
        self
    }

    /// Set driver URL
    #[must_use]
    pub fn with_driver_url(mut self, url: impl Into<String>) -> Self {
        self.driver_url = url.into();
        self
    }

    /// Set window switch budget
    #[must_use]
    pub const fn with_default_timeout(mut self, ms: Option<u64>) -> Self {
        self.default_timeout = ms;
        self
    }

    /// Set element wait budget
    #[must_use]
    pub const fn with_element_timeout(mut self, ms: u64) -> Self {
        self.element_timeout = ms;
        self
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set screenshot directory
    #[must_use]
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    /// Window switch budget as a duration
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout.map(Duration::from_millis)
    }

    /// Element wait budget as a duration
    #[must_use]
    pub const fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout)
    }

    /// Resolve a page path or absolute URL against `base_url`
    #[must_use]
    pub fn resolve_url(&self, path: &str) -> String {
        if path.contains("://") {
            return path.to_string();
        }
        match &self.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }
}

/// One partial configuration source; unset fields leave the lower layer alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayer {
    /// Browser name, validated when applied
    pub browser_name: Option<String>,
    /// Browser version
    pub browser_version: Option<String>,
    /// Driver URL
    #[serde(alias = "seleniumUrl")]
    pub driver_url: Option<String>,
    /// Window switch budget in ms
    pub default_timeout: Option<u64>,
    /// Element wait budget in ms
    pub element_timeout: Option<u64>,
    /// Base URL
    pub base_url: Option<String>,
    /// Screenshot directory
    pub screenshot_dir: Option<PathBuf>,
}

impl ConfigLayer {
    /// Read a layer from a JSON file; any failure yields an empty layer
    #[must_use]
    pub fn from_file(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(layer) => layer,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
                Self::default()
            }
        }
    }

    /// Read a layer from environment variables; empty values count as unset
    pub fn from_env<F>(lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_ms = |key: &str| -> HarnessResult<Option<u64>> {
            get(key)
                .map(|v| {
                    v.trim().parse::<u64>().map_err(|_| {
                        HarnessError::config(format!("{key} must be milliseconds, got {v:?}"))
                    })
                })
                .transpose()
        };

        Ok(Self {
            browser_name: get(env::BROWSER_NAME),
            browser_version: get(env::BROWSER_VERSION),
            driver_url: get(env::DRIVER_URL).or_else(|| get(env::SELENIUM_URL)),
            default_timeout: get_ms(env::DEFAULT_TIMEOUT)?,
            element_timeout: get_ms(env::ELEMENT_TIMEOUT)?,
            base_url: get(env::BASE_URL),
            screenshot_dir: get(env::SCREENSHOT_DIR).map(PathBuf::from),
        })
    }
}
