//! CLI configuration

use pagewright::logging::LogFormat;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Level from the `-q` and `-v` flags; quiet wins
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// `-v` count handed to the log filter
    #[must_use]
    pub const fn log_level(self) -> u8 {
        match self {
            Self::Quiet | Self::Normal => 0,
            Self::Verbose => 1,
            Self::Debug => 2,
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Apply the choice to `console` styling
    pub fn apply(self) {
        match self {
            Self::Always => console::set_colors_enabled(true),
            Self::Never => console::set_colors_enabled(false),
            Self::Auto => {}
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Log line format
    pub log_format: LogFormat,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set log format
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, 4), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(Verbosity::Quiet.log_level(), 0);
        assert_eq!(Verbosity::Debug.log_level(), 2);
        assert!(Verbosity::Debug.is_verbose());
        assert!(!Verbosity::Normal.is_quiet());
    }

    #[test]
    fn test_builder() {
        let config = CliConfig::new()
            .with_verbosity(Verbosity::Verbose)
            .with_color(ColorChoice::Never)
            .with_log_format(LogFormat::Json);
        assert_eq!(config.verbosity, Verbosity::Verbose);
        assert_eq!(config.color, ColorChoice::Never);
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
