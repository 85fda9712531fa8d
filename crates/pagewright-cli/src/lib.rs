//! Pagewright CLI library
//!
//! Command-line front end for the Pagewright harness: run feature files,
//! inspect the resolved configuration and validate registries.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{CheckArgs, Cli, ColorArg, Commands, ConfigArgs, RunArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::format_summary;
