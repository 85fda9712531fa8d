//! Command handlers - extracted from main.rs for testability

pub mod check;
pub mod config;
pub mod run;

pub use check::{describe_pages, describe_windows, execute_check};
pub use config::{execute_config, render_config, resolve_config};
pub use run::{execute_run, registry_path, DEFAULT_REGISTRY_FILE};
