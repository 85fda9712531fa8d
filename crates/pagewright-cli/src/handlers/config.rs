//! Config command handler

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::ConfigArgs;
use pagewright::{Config, ConfigLayer};
use std::path::Path;

/// Execute the config command
pub fn execute_config(_config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let resolved = resolve_config(&args.config, ConfigLayer::default())?;
    println!("{}", render_config(&resolved)?);
    Ok(())
}

/// Defaults, then the file, then the environment, then command-line overrides
pub fn resolve_config(path: &Path, overrides: ConfigLayer) -> CliResult<Config> {
    resolve_config_with(path, overrides, |key| std::env::var(key).ok())
}

/// [`resolve_config`] with an explicit environment lookup
pub fn resolve_config_with<F>(path: &Path, overrides: ConfigLayer, lookup: F) -> CliResult<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::load_with(path, lookup)?;
    config.apply(overrides)?;
    Ok(config)
}

/// Pretty JSON with the same keys the config file uses
pub fn render_config(config: &Config) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(config)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pagewright::BrowserName;
    use std::collections::HashMap;
    use std::io::Write;

    fn config_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_overrides_beat_environment() {
        let file = config_file(r#"{ "browserName": "chrome", "defaultTimeout": 2000 }"#);
        let env: HashMap<&str, &str> = [("BROWSER_NAME", "chrome"), ("DEFAULT_TIMEOUT", "4000")]
            .into_iter()
            .collect();
        let overrides = ConfigLayer {
            browser_name: Some("firefox".to_string()),
            ..ConfigLayer::default()
        };

        let config = resolve_config_with(file.path(), overrides, |key| {
            env.get(key).map(ToString::to_string)
        })
        .unwrap();

        assert_eq!(config.browser_name, BrowserName::Firefox);
        assert_eq!(config.default_timeout, Some(4000));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            resolve_config_with(Path::new("does/not/exist.json"), ConfigLayer::default(), |_| {
                None
            })
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unsupported_browser_override_is_rejected() {
        let overrides = ConfigLayer {
            browser_name: Some("netscape".to_string()),
            ..ConfigLayer::default()
        };
        let err = resolve_config_with(Path::new("missing.json"), overrides, |_| None).unwrap_err();
        assert!(err.to_string().contains("netscape"));
    }

    #[test]
    fn test_render_uses_camel_case_keys() {
        let rendered = render_config(&Config::default().with_default_timeout(Some(1500))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["browserName"], "chrome");
        assert_eq!(value["defaultTimeout"], 1500);
        assert!(value["browserVersion"].is_null());
    }
}
