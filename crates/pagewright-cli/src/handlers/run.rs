//! Run command handler

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::handlers::config::resolve_config;
use crate::RunArgs;
use pagewright::{ConfigLayer, Registries};
use std::path::{Path, PathBuf};

/// Registry picked up from the working directory when `--registry` is absent
pub const DEFAULT_REGISTRY_FILE: &str = "pagewright.yaml";

/// Execute the run command
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    if !args.features.exists() {
        return Err(CliError::invalid_argument(format!(
            "no feature files at {}",
            args.features.display()
        )));
    }

    let harness_config = resolve_config(&args.config, overrides(args))?;
    let registries = match registry_path(args.registry.as_deref(), Path::new(".")) {
        Some(path) => Registries::load(&path)?,
        None => {
            tracing::warn!("no registry file; only absolute URLs and unnamed steps will work");
            Registries::default()
        }
    };

    run_with_browser(config, args, harness_config, registries)
}

#[cfg(feature = "browser")]
fn run_with_browser(
    config: &CliConfig,
    args: &RunArgs,
    harness_config: pagewright::Config,
    registries: Registries,
) -> CliResult<()> {
    use pagewright::{run_features, CdpSessionFactory, Harness};
    use std::sync::Arc;

    tracing::info!(
        browser = %harness_config.browser_name,
        driver_url = %harness_config.driver_url,
        "running features"
    );
    let harness = Harness::new(harness_config, Arc::new(CdpSessionFactory::new()))
        .with_registries(registries);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::config(format!("Failed to create runtime: {e}")))?;
    let summary = rt.block_on(run_features(harness, &args.features))?;

    if !config.verbosity.is_quiet() {
        println!("{}", crate::output::format_summary(&summary));
    }
    outcome(&summary)
}

/// Failure counts kept apart so the error names what actually went wrong
pub fn outcome(summary: &pagewright::RunSummary) -> CliResult<()> {
    if summary.failed() {
        return Err(CliError::ScenariosFailed {
            failed_steps: summary.failed_steps,
            hook_errors: summary.hook_errors,
            parsing_errors: summary.parsing_errors,
        });
    }
    Ok(())
}

#[cfg(not(feature = "browser"))]
fn run_with_browser(
    _config: &CliConfig,
    _args: &RunArgs,
    _harness_config: pagewright::Config,
    _registries: Registries,
) -> CliResult<()> {
    Err(CliError::config(
        "browser support not enabled. Rebuild with --features browser",
    ))
}

/// Command-line flags as the top configuration layer
#[must_use]
pub fn overrides(args: &RunArgs) -> ConfigLayer {
    ConfigLayer {
        browser_name: args.browser.clone(),
        driver_url: args.driver_url.clone(),
        base_url: args.base_url.clone(),
        ..ConfigLayer::default()
    }
}

/// The explicit registry, else [`DEFAULT_REGISTRY_FILE`] in `dir` if present
#[must_use]
pub fn registry_path(explicit: Option<&Path>, dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let fallback = dir.join(DEFAULT_REGISTRY_FILE);
    fallback.is_file().then_some(fallback)
}
