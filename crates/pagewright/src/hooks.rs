//! Scenario lifecycle and the feature runner.
//!
//! ```text
//! run_features(harness, path)
//!   └─ for each scenario not tagged @ignore (one at a time)
//!        before: world.start(harness, scenario)   failure fails the scenario
//!        steps
//!        after:  screenshot when failed, then world.stop()
//! ```

use crate::result::HarnessResult;
use crate::world::{BrowserWorld, Harness};
use cucumber::gherkin::{Feature, Rule, Scenario};
use cucumber::writer::Stats as _;
use cucumber::{cli, event, writer, World as _, WriterExt as _};
use std::path::Path;
use std::sync::Arc;

/// Tag that removes a scenario (or a whole feature) from the run
pub const IGNORE_TAG: &str = "ignore";

/// Outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Steps that passed
    pub passed_steps: usize,
    /// Steps that were skipped
    pub skipped_steps: usize,
    /// Steps that failed
    pub failed_steps: usize,
    /// Feature files that could not be parsed
    pub parsing_errors: usize,
    /// Hooks that failed
    pub hook_errors: usize,
}

impl RunSummary {
    /// Whether anything failed
    #[must_use]
    pub const fn failed(&self) -> bool {
        self.failed_steps > 0 || self.parsing_errors > 0 || self.hook_errors > 0
    }
}

/// Whether a scenario takes part in the run
#[must_use]
pub fn is_runnable(feature: &Feature, rule: Option<&Rule>, scenario: &Scenario) -> bool {
    let ignored = |tags: &[String]| tags.iter().any(|t| t == IGNORE_TAG);
    !(ignored(&feature.tags) || rule.is_some_and(|r| ignored(&r.tags)) || ignored(&scenario.tags))
}

/// Whether a finished scenario counts as failed
#[must_use]
pub fn scenario_failed(finished: &event::ScenarioFinished) -> bool {
    matches!(
        finished,
        event::ScenarioFinished::StepFailed(..) | event::ScenarioFinished::BeforeHookFailed(_)
    )
}

/// Before-each-scenario hook body
pub async fn start_scenario(world: &mut BrowserWorld, harness: Arc<Harness>, scenario: &str) {
    if let Err(e) = world.start(harness, scenario).await {
        tracing::error!(scenario, error = %e, "could not open a browser session");
        // cucumber reports a panicking before-hook as a failed scenario
        panic!("{e}");
    }
}

/// After-each-scenario hook body
pub async fn finish_scenario(world: &mut BrowserWorld, failed: bool) {
    if failed && world.is_started() {
        match world.take_screenshot().await {
            Ok(path) => tracing::info!(path = %path.display(), "failure screenshot taken"),
            Err(e) => tracing::warn!(error = %e, "failure screenshot could not be taken"),
        }
    }
    if let Err(e) = world.stop().await {
        tracing::warn!(error = %e, "closing the browser session failed");
    }
}

/// Run the feature files under `path` with the built-in steps.
///
/// Scenarios run one at a time, each with its own browser session.
pub async fn run_features(harness: Harness, path: impl AsRef<Path>) -> HarnessResult<RunSummary> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no feature files at {}", path.display()),
        )
        .into());
    }
    crate::steps::ensure_linked();
    let harness = Arc::new(harness);
    tracing::info!(
        features = %path.display(),
        pages = harness.pages.len(),
        windows = harness.windows.len(),
        "running features"
    );

    // explicit options keep cucumber from parsing our own command line
    let opts = cli::Opts::<_, _, _, cli::Empty>::default();
    let before = Arc::clone(&harness);
    let stats = BrowserWorld::cucumber()
        .max_concurrent_scenarios(1)
        .before(move |_feature, _rule, scenario, world| {
            let harness = Arc::clone(&before);
            Box::pin(async move { start_scenario(world, harness, &scenario.name).await })
        })
        .after(|_feature, _rule, _scenario, finished, world| {
            let failed = scenario_failed(finished);
            Box::pin(async move {
                if let Some(world) = world {
                    finish_scenario(world, failed).await;
                }
            })
        })
        .with_writer(
            writer::Basic::stdout()
                .summarized()
                .assert_normalized(),
        )
        .with_cli(opts)
        .filter_run(path, is_runnable)
        .await;

    let summary = RunSummary {
        passed_steps: stats.passed_steps(),
        skipped_steps: stats.skipped_steps(),
        failed_steps: stats.failed_steps(),
        parsing_errors: stats.parsing_errors(),
        hook_errors: stats.hook_errors(),
    };
    tracing::info!(?summary, "run finished");
    Ok(summary)
}
