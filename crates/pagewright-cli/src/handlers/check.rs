//! Check command handler

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::heading;
use crate::CheckArgs;
use pagewright::Registries;

/// Execute the check command
pub fn execute_check(config: &CliConfig, args: &CheckArgs) -> CliResult<()> {
    let registries = Registries::load(&args.registry)?;
    tracing::debug!(
        path = %args.registry.display(),
        pages = registries.pages.len(),
        windows = registries.windows.len(),
        "registry loaded"
    );

    if config.verbosity.is_quiet() {
        return Ok(());
    }
    println!("{}", heading("Pages"));
    for line in describe_pages(&registries) {
        println!("{line}");
    }
    println!("{}", heading("Windows"));
    for line in describe_windows(&registries) {
        println!("{line}");
    }
    Ok(())
}

/// One line per page, then one indented line per element
#[must_use]
pub fn describe_pages(registries: &Registries) -> Vec<String> {
    let mut lines = Vec::new();
    for name in registries.pages.names() {
        let Ok(page) = registries.pages.get(name) else {
            continue;
        };
        let path = page.path().unwrap_or("-");
        lines.push(format!("  {name} ({path})"));
        for element in page.elements() {
            let deferred = if element.initially_loaded { "" } else { " [deferred]" };
            lines.push(format!("    {}: {}{deferred}", element.name, element.by));
        }
    }
    lines
}

/// One line per window with its title pattern
#[must_use]
pub fn describe_windows(registries: &Registries) -> Vec<String> {
    registries
        .windows
        .names()
        .into_iter()
        .filter_map(|name| registries.windows.get(name))
        .map(|window| format!("  {}: /{}/", window.name(), window.pattern()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"
pages:
  - name: login
    path: /login
    elements:
      - { name: username, by: { name: username } }
      - { name: help, by: { link_text: "Need help?" }, initially_loaded: false }
  - name: dashboard
windows:
  - { name: help, title: "^Help Center$" }
"#;

    #[test]
    fn test_describe_pages() {
        let registries = Registries::from_yaml(REGISTRY).unwrap();
        assert_eq!(
            describe_pages(&registries),
            vec![
                "  dashboard (-)".to_string(),
                "  login (/login)".to_string(),
                "    username: name=username".to_string(),
                "    help: link_text=Need help? [deferred]".to_string(),
            ]
        );
    }

    #[test]
    fn test_describe_windows() {
        let registries = Registries::from_yaml(REGISTRY).unwrap();
        assert_eq!(
            describe_windows(&registries),
            vec!["  help: /^Help Center$/".to_string()]
        );
    }
}
