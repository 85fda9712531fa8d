//! Pagewright: cucumber-driven end-to-end browser testing
//!
//! Feature files are run by cucumber against a remote browser reached over
//! the Chrome `DevTools` Protocol. Each scenario gets a fresh
//! [`BrowserWorld`] with its own browser session; steps address pages,
//! elements and windows by name through explicit registries.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      PAGEWRIGHT Architecture                     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌──────────┐   ┌──────────────┐   ┌──────────────────────┐     │
//! │   │ .feature │──►│ BrowserWorld │──►│ dyn BrowserSession   │     │
//! │   │ (gherkin)│   │ + Harness    │   │ CdpSession / Mock    │     │
//! │   └──────────┘   └──────┬───────┘   └──────────────────────┘     │
//! │                         │                                        │
//! │         ┌───────────────┼────────────────┐                       │
//! │         ▼               ▼                ▼                       │
//! │   PageRegistry    WindowRegistry       Config                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pagewright::{run_features, Config, Harness, MockSession, MockSessionFactory};
//! use std::sync::Arc;
//!
//! let harness = Harness::new(Config::load()?, Arc::new(MockSessionFactory::new(MockSession::new())));
//! let summary = run_features(harness, "tests/features").await?;
//! assert!(!summary.failed());
//! ```

#![warn(missing_docs)]

mod config;
mod locator;
mod page_object;
mod registry;
mod result;
mod session;
mod steps;

/// Scenario lifecycle and the feature runner
pub mod hooks;

/// `tracing` subscriber setup
pub mod logging;

/// Scriptable in-memory browser session for tests
pub mod mock;

/// Explicit waits
pub mod wait;

/// Window registry and the window switch resolver
pub mod window;

/// Per-scenario execution context
pub mod world;

/// Chrome `DevTools` Protocol sessions (requires `browser` feature)
#[cfg(feature = "browser")]
pub mod cdp;

pub use config::{env, BrowserName, Config, ConfigLayer, DEFAULT_CONFIG_FILE, DEFAULT_DRIVER_URL};
pub use hooks::{run_features, RunSummary, IGNORE_TAG};
pub use locator::{Locator, Query};
pub use mock::{MockElement, MockSession, MockSessionFactory, MockWindow};
pub use page_object::{PageElement, PageObject, PageRegistry};
pub use registry::Registries;
pub use result::{HarnessError, HarnessResult};
pub use session::{BrowserSession, Capabilities, ElementHandle, SessionFactory, WindowHandle};
pub use wait::{WaitCondition, WaitOptions, WaitOutcome};
pub use window::{
    is_window_open, switch_to_window, RetryPlan, SwitchAttempt, WindowDescriptor, WindowError,
    WindowRegistry,
};
pub use world::{Attachment, BrowserWorld, Harness, MediaType};

#[cfg(feature = "browser")]
pub use cdp::{CdpSession, CdpSessionFactory};

/// Re-export cucumber so downstream step crates use the same version
pub use cucumber;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        BrowserWorld, Config, Harness, HarnessError, HarnessResult, Locator, PageElement,
        PageObject, PageRegistry, WindowDescriptor, WindowRegistry,
    };
    pub use cucumber::{given, then, when};
}
