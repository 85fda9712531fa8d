//! `tracing` subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise the level follows the verbosity
//! count (`-v` debug, `-vv` trace).

use crate::result::{HarnessError, HarnessResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, to stderr
    #[default]
    Pretty,
    /// One JSON object per line, to stderr
    Json,
}

/// Filter directive for a verbosity count
#[must_use]
pub fn directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "pagewright=info",
        1 => "pagewright=debug",
        _ => "pagewright=trace",
    }
}

fn filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(verbosity)))
}

/// Install the global subscriber; fails when one is already installed
pub fn init(verbosity: u8, format: LogFormat) -> HarnessResult<()> {
    let registry = tracing_subscriber::registry().with(filter(verbosity));
    let result = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| HarnessError::config(format!("logging already initialised: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_levels() {
        assert_eq!(directive(0), "pagewright=info");
        assert_eq!(directive(1), "pagewright=debug");
        assert_eq!(directive(5), "pagewright=trace");
    }

    #[test]
    fn test_second_init_fails() {
        // the first call may already have happened in another test
        let _ = init(0, LogFormat::Json);
        assert!(init(0, LogFormat::Pretty).is_err());
    }
}
