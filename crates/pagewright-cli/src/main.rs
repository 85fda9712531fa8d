//! Pagewright CLI: run cucumber features against a remote browser
//!
//! ## Usage
//!
//! ```bash
//! pagewright run features/ --registry pages.yaml   # Run feature files
//! pagewright run features/ --browser firefox       # Override the browser
//! pagewright config                                # Show resolved config
//! pagewright check pages.yaml                      # Validate a registry
//! ```

use clap::Parser;
use pagewright::logging::{self, LogFormat};
use pagewright_cli::{handlers, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    // Build configuration from CLI args
    let config = build_config(&cli);
    config.color.apply();
    logging::init(config.verbosity.log_level(), config.log_format)?;

    match cli.command {
        Commands::Run(args) => handlers::execute_run(&config, &args),
        Commands::Config(args) => handlers::execute_config(&config, &args),
        Commands::Check(args) => handlers::execute_check(&config, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();
    let log_format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_log_format(log_format)
}
