//! Page Object Model support.
//!
//! A [`PageObject`] names the elements of one page of the application under
//! test. Step definitions refer to pages and elements by name only; the
//! [`PageRegistry`] resolves those names to locators.

use crate::locator::Locator;
use crate::result::{HarnessError, HarnessResult};
use regex::Regex;
use std::collections::HashMap;

/// A named element of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageElement {
    /// Name used in steps
    pub name: String,
    /// How to find it
    pub by: Locator,
    /// Must be visible as soon as the page is displayed
    pub initially_loaded: bool,
}

impl PageElement {
    /// Element that is present when the page loads
    #[must_use]
    pub fn new(name: impl Into<String>, by: Locator) -> Self {
        Self {
            name: name.into(),
            by,
            initially_loaded: true,
        }
    }

    /// Element that only appears after some interaction
    #[must_use]
    pub fn deferred(name: impl Into<String>, by: Locator) -> Self {
        Self {
            initially_loaded: false,
            ..Self::new(name, by)
        }
    }
}

/// A page of the application under test
#[derive(Debug, Clone)]
pub struct PageObject {
    name: String,
    path: Option<String>,
    url_pattern: Option<Regex>,
    elements: Vec<PageElement>,
}

impl PageObject {
    /// Create an empty page object
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            url_pattern: None,
            elements: Vec::new(),
        }
    }

    /// Set the path opened by `open_page`, relative to the base URL
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the pattern the current URL must match while the page is displayed
    #[must_use]
    pub fn with_url_pattern(mut self, pattern: Regex) -> Self {
        self.url_pattern = Some(pattern);
        self
    }

    /// Add an element; lookups by name return the first declared
    #[must_use]
    pub fn with_element(mut self, element: PageElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Page name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path relative to the base URL
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// URL pattern
    #[must_use]
    pub fn url_pattern(&self) -> Option<&Regex> {
        self.url_pattern.as_ref()
    }

    /// Whether `url` belongs to this page; pages without a pattern match
    /// every URL
    #[must_use]
    pub fn matches_url(&self, url: &str) -> bool {
        self.url_pattern.as_ref().map_or(true, |p| p.is_match(url))
    }

    /// All elements, in declaration order
    #[must_use]
    pub fn elements(&self) -> &[PageElement] {
        &self.elements
    }

    /// Look up an element by name
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&PageElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Elements that must be visible once the page is displayed
    pub fn initially_loaded(&self) -> impl Iterator<Item = &PageElement> {
        self.elements.iter().filter(|e| e.initially_loaded)
    }
}

/// Registry of page objects, keyed by name
#[derive(Debug, Clone, Default)]
pub struct PageRegistry {
    pages: HashMap<String, PageObject>,
}

impl PageRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page; names must be unique
    pub fn register(&mut self, page: PageObject) -> HarnessResult<()> {
        if self.pages.contains_key(page.name()) {
            return Err(HarnessError::Registry {
                message: format!("page {:?} registered twice", page.name()),
            });
        }
        let _ = self.pages.insert(page.name().to_string(), page);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, page: PageObject) -> HarnessResult<Self> {
        self.register(page)?;
        Ok(self)
    }

    /// Look up a page
    pub fn get(&self, name: &str) -> HarnessResult<&PageObject> {
        self.pages.get(name).ok_or_else(|| HarnessError::UnknownPage {
            name: name.to_string(),
        })
    }

    /// Locator of `element` on `page`
    pub fn locator(&self, page: &str, element: &str) -> HarnessResult<&Locator> {
        self.get(page)?
            .element(element)
            .map(|e| &e.by)
            .ok_or_else(|| HarnessError::UnknownElement {
                page: page.to_string(),
                element: element.to_string(),
            })
    }

    /// Registered page names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pages.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no page is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn login_page() -> PageObject {
        PageObject::new("login")
            .with_path("/login")
            .with_url_pattern(Regex::new("/login$").unwrap())
            .with_element(PageElement::new("username", Locator::css("input[name=username]")))
            .with_element(PageElement::new("password", Locator::css("input[name=password]")))
            .with_element(PageElement::deferred("error", Locator::css(".error")))
    }

    mod page_object_tests {
        use super::*;

        #[test]
        fn test_element_lookup() {
            let page = login_page();
            assert_eq!(
                page.element("username").map(|e| &e.by),
                Some(&Locator::css("input[name=username]"))
            );
            assert!(page.element("missing").is_none());
        }

        #[test]
        fn test_initially_loaded_skips_deferred() {
            let page = login_page();
            let names: Vec<_> = page
                .initially_loaded()
                .map(|e| e.name.as_str())
                .collect();
            assert_eq!(names, vec!["username", "password"]);
        }

        #[test]
        fn test_url_matching() {
            let page = login_page();
            assert!(page.matches_url("http://app.test/login"));
            assert!(!page.matches_url("http://app.test/login/reset"));
            assert!(PageObject::new("any").matches_url("about:blank"));
        }
    }

    mod page_registry_tests {
        use super::*;

        #[test]
        fn test_unknown_page() {
            let registry = PageRegistry::new();
            let err = registry.get("home").unwrap_err();
            assert_eq!(err.to_string(), "Invalid page object name: home");
        }

        #[test]
        fn test_unknown_element() {
            let registry = PageRegistry::new().with(login_page()).unwrap();
            assert!(matches!(
                registry.locator("login", "submit"),
                Err(HarnessError::UnknownElement { .. })
            ));
            assert!(matches!(
                registry.locator("home", "submit"),
                Err(HarnessError::UnknownPage { .. })
            ));
        }

        #[test]
        fn test_locator() {
            let registry = PageRegistry::new().with(login_page()).unwrap();
            assert_eq!(
                registry.locator("login", "error").unwrap(),
                &Locator::css(".error")
            );
        }

        #[test]
        fn test_duplicate_page_rejected() {
            let mut registry = PageRegistry::new();
            registry.register(login_page()).unwrap();
            assert!(matches!(
                registry.register(PageObject::new("login")),
                Err(HarnessError::Registry { .. })
            ));
            assert_eq!(registry.len(), 1);
            assert_eq!(registry.names(), vec!["login"]);
        }
    }
}
