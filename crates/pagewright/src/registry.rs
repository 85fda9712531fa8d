//! Registry files.
//!
//! Pages and windows can be declared in a YAML or JSON file instead of in
//! code. The format is picked by extension (`.json` is JSON, anything else
//! is YAML):
//!
//! ```yaml
//! pages:
//!   - name: login
//!     path: /login
//!     url_pattern: "/login$"
//!     elements:
//!       - { name: username, by: { css: "input[name=username]" } }
//!       - { name: error, by: { css: ".error" }, initially_loaded: false }
//! windows:
//!   - { name: popup, title: "^Popup Window$" }
//! ```

use crate::locator::Locator;
use crate::page_object::{PageElement, PageObject, PageRegistry};
use crate::result::{HarnessError, HarnessResult};
use crate::window::{WindowDescriptor, WindowRegistry};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

/// Both registries, as loaded from one file
#[derive(Debug, Clone, Default)]
pub struct Registries {
    /// Page objects
    pub pages: PageRegistry,
    /// Windows
    pub windows: WindowRegistry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default)]
    pages: Vec<PageEntry>,
    #[serde(default)]
    windows: Vec<WindowEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageEntry {
    name: String,
    path: Option<String>,
    url_pattern: Option<String>,
    #[serde(default)]
    elements: Vec<ElementEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ElementEntry {
    name: String,
    /// `{ css: "..." }` in YAML as well as JSON, not a `!css` tag
    #[serde(with = "serde_yaml_ng::with::singleton_map")]
    by: Locator,
    #[serde(default = "default_initially_loaded")]
    initially_loaded: bool,
}

const fn default_initially_loaded() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WindowEntry {
    name: String,
    title: String,
}

impl Registries {
    /// Load a registry file
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_yaml(&text)
        }
    }

    /// Parse a YAML document
    pub fn from_yaml(text: &str) -> HarnessResult<Self> {
        Self::build(serde_yaml_ng::from_str(text)?)
    }

    /// Parse a JSON document
    pub fn from_json(text: &str) -> HarnessResult<Self> {
        Self::build(serde_json::from_str(text)?)
    }

    fn build(file: RegistryFile) -> HarnessResult<Self> {
        let mut registries = Self::default();

        for entry in file.pages {
            let mut page = PageObject::new(&entry.name);
            if let Some(path) = entry.path {
                page = page.with_path(path);
            }
            if let Some(pattern) = entry.url_pattern {
                page = page.with_url_pattern(compile(&pattern, &entry.name)?);
            }
            for element in entry.elements {
                if page.element(&element.name).is_some() {
                    return Err(HarnessError::Registry {
                        message: format!(
                            "element {:?} declared twice on page {:?}",
                            element.name, entry.name
                        ),
                    });
                }
                let element = if element.initially_loaded {
                    PageElement::new(element.name, element.by)
                } else {
                    PageElement::deferred(element.name, element.by)
                };
                page = page.with_element(element);
            }
            registries.pages.register(page)?;
        }

        for entry in file.windows {
            let title = compile(&entry.title, &entry.name)?;
            registries
                .windows
                .register(WindowDescriptor::from_regex(entry.name, title))?;
        }

        tracing::debug!(
            pages = registries.pages.len(),
            windows = registries.windows.len(),
            "registry loaded"
        );
        Ok(registries)
    }
}

fn compile(pattern: &str, owner: &str) -> HarnessResult<Regex> {
    Regex::new(pattern).map_err(|e| HarnessError::Registry {
        message: format!("invalid pattern for {owner:?}: {e}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
pages:
  - name: login
    path: /login
    url_pattern: "/login$"
    elements:
      - { name: username, by: { css: "input[name=username]" } }
      - { name: help, by: { link_text: "Need help?" } }
      - { name: error, by: { css: ".error" }, initially_loaded: false }
windows:
  - { name: popup, title: "^Popup Window$" }
"#;

    #[test]
    fn test_yaml() {
        let registries = Registries::from_yaml(YAML).unwrap();
        let page = registries.pages.get("login").unwrap();
        assert_eq!(page.path(), Some("/login"));
        assert_eq!(page.initially_loaded().count(), 2);
        assert_eq!(
            registries.pages.locator("login", "help").unwrap(),
            &Locator::link_text("Need help?")
        );
        assert!(registries.windows.get("popup").unwrap().matches("Popup Window"));
    }

    #[test]
    fn test_json_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"windows": [{{"name": "help", "title": "Help"}}]}}"#
        )
        .unwrap();

        let registries = Registries::load(file.path()).unwrap();
        assert!(registries.pages.is_empty());
        assert_eq!(registries.windows.names(), vec!["help"]);
    }

    #[test]
    fn test_yaml_locator_is_a_single_key_map() {
        let yaml = "pages:\n  - name: p\n    elements:\n      - { name: a, by: { css: \"#x\" } }\n";
        let registries = Registries::from_yaml(yaml).unwrap();
        assert_eq!(
            registries.pages.locator("p", "a").unwrap(),
            &Locator::css("#x")
        );
    }

    #[test]
    fn test_json_element_locator() {
        let json = r##"{"pages": [{"name": "p", "elements": [{"name": "a", "by": {"xpath": "//a"}}]}]}"##;
        let registries = Registries::from_json(json).unwrap();
        assert_eq!(
            registries.pages.locator("p", "a").unwrap(),
            &Locator::xpath("//a")
        );
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        let registries = Registries::load(file.path()).unwrap();
        assert_eq!(registries.pages.names(), vec!["login"]);
    }

    #[test]
    fn test_duplicate_window_rejected() {
        let yaml = "windows:\n  - { name: a, title: x }\n  - { name: a, title: y }\n";
        assert!(matches!(
            Registries::from_yaml(yaml),
            Err(HarnessError::Registry { .. })
        ));
    }

    #[test]
    fn test_duplicate_element_rejected() {
        let yaml = r"
pages:
  - name: p
    elements:
      - { name: a, by: { id: x } }
      - { name: a, by: { id: y } }
";
        assert!(matches!(
            Registries::from_yaml(yaml),
            Err(HarnessError::Registry { .. })
        ));
    }

    #[test]
    fn test_bad_pattern() {
        let err = Registries::from_yaml("windows:\n  - { name: a, title: \"(\" }\n").unwrap_err();
        assert!(err.to_string().contains("\"a\""));
    }

    #[test]
    fn test_unknown_field() {
        assert!(matches!(
            Registries::from_yaml("pagez: []\n"),
            Err(HarnessError::Yaml(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Registries::load(Path::new("/nonexistent/registry.yaml")),
            Err(HarnessError::Io(_))
        ));
    }
}
