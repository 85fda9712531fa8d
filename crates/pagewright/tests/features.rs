//! End-to-end cucumber run of the built-in steps against a scripted browser.
//!
//! Run with: cargo test --test features

use pagewright::{
    run_features, Config, Harness, Locator, MockElement, MockSession, MockSessionFactory,
    MockWindow, Registries,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn manifest_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

/// A login page with a help link that opens the help center in a popup
fn application() -> MockSession {
    MockSession::new().with_window(
        MockWindow::new("main", "Sign in")
            .with_element(MockElement::new(Locator::name("username"), ""))
            .with_element(MockElement::new(Locator::name("password"), ""))
            .with_element(MockElement::new(Locator::css("button[type=submit]"), "Sign in"))
            .with_element(
                MockElement::new(Locator::link_text("Need help?"), "Need help?")
                    .opens_window(MockWindow::new("help", "Help Center")),
            ),
    )
}

fn harness(factory: &MockSessionFactory, screenshots: &Path) -> Harness {
    let registries =
        Registries::load(&manifest_path("tests/registry.yaml")).expect("registry loads");
    let config = Config::default()
        .with_base_url("http://app.test")
        .with_element_timeout(500)
        .with_screenshot_dir(screenshots);
    Harness::new(config, Arc::new(factory.clone())).with_registries(registries)
}

fn png_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map_or(0, |entries| {
        entries
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"))
            .count()
    })
}

async fn passing_features() {
    let screenshots = tempfile::tempdir().expect("tempdir");
    let factory = MockSessionFactory::new(application());

    let summary = run_features(harness(&factory, screenshots.path()), manifest_path("tests/features"))
        .await
        .expect("features run");

    assert!(!summary.failed(), "unexpected failures: {summary:?}");
    assert!(summary.passed_steps > 0);

    // one session per runnable scenario, the @ignore one never starts
    let opened = factory.opened();
    assert_eq!(opened.len(), 3);
    assert!(opened.iter().all(|(_, session)| session.is_quit()));
    assert!(opened
        .iter()
        .any(|(_, session)| session.typed().contains(&("name=username".to_string(), "alice".to_string()))));

    // only the explicit screenshot step wrote a file
    assert_eq!(png_count(screenshots.path()), 1);
}

async fn failing_features() {
    let screenshots = tempfile::tempdir().expect("tempdir");
    let factory = MockSessionFactory::new(application());

    let summary = run_features(
        harness(&factory, screenshots.path()),
        manifest_path("tests/failing_features"),
    )
    .await
    .expect("features run");

    assert!(summary.failed());
    assert_eq!(summary.failed_steps, 1);
    assert!(factory.opened()[0].1.is_quit());
    // the after-hook captured the failure
    assert_eq!(png_count(screenshots.path()), 1);
}

#[tokio::main]
async fn main() {
    passing_features().await;
    failing_features().await;
}
