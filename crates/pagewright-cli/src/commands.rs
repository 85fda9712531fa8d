//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pagewright: run cucumber features against a remote browser
#[derive(Parser, Debug)]
#[command(name = "pagewright")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log as one JSON object per line
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run feature files with the built-in steps
    Run(RunArgs),

    /// Show the resolved configuration
    Config(ConfigArgs),

    /// Validate a page and window registry file
    Check(CheckArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Feature file or directory of feature files
    pub features: PathBuf,

    /// Configuration file
    #[arg(short, long, default_value = pagewright::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Page and window registry (YAML or JSON)
    #[arg(short, long)]
    pub registry: Option<PathBuf>,

    /// Browser to drive (overrides config and environment)
    #[arg(short, long)]
    pub browser: Option<String>,

    /// Browser debugging endpoint (overrides config and environment)
    #[arg(long)]
    pub driver_url: Option<String>,

    /// Base URL for relative paths (overrides config and environment)
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration file
    #[arg(short, long, default_value = pagewright::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Registry file to validate
    pub registry: PathBuf,
}

/// Color output argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_run() {
            let cli = Cli::try_parse_from([
                "pagewright",
                "-vv",
                "run",
                "features/",
                "--registry",
                "pages.yaml",
                "--browser",
                "firefox",
            ])
            .unwrap();
            assert_eq!(cli.verbose, 2);
            match cli.command {
                Commands::Run(args) => {
                    assert_eq!(args.features, PathBuf::from("features/"));
                    assert_eq!(args.registry, Some(PathBuf::from("pages.yaml")));
                    assert_eq!(args.browser.as_deref(), Some("firefox"));
                    assert_eq!(args.config, PathBuf::from("e2econfig.json"));
                    assert!(args.driver_url.is_none());
                }
                other => panic!("unexpected command: {other:?}"),
            }
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = Cli::try_parse_from(["pagewright", "config", "--json-logs", "-q"]).unwrap();
            assert!(cli.json_logs);
            assert!(cli.quiet);
        }

        #[test]
        fn test_check_requires_path() {
            assert!(Cli::try_parse_from(["pagewright", "check"]).is_err());
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["pagewright"]).is_err());
        }
    }
}
