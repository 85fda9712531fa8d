//! Element locators.
//!
//! A [`Locator`] names how to find an element, the way selenium's `By` does.
//! Every variant lowers to either a CSS selector or an XPath expression,
//! which is all a CDP session understands.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How to find an element in the page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locator {
    /// CSS selector (e.g., "button.primary")
    #[serde(rename = "css")]
    Css(String),
    /// XPath expression
    #[serde(rename = "xpath")]
    XPath(String),
    /// Element id attribute
    #[serde(rename = "id")]
    Id(String),
    /// Element name attribute
    #[serde(rename = "name")]
    Name(String),
    /// Exact visible text of a link
    #[serde(rename = "link_text")]
    LinkText(String),
}

/// A locator lowered to something a driver can execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// CSS selector
    Css(String),
    /// XPath expression
    XPath(String),
}

impl Locator {
    /// Create a CSS locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath locator
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create an id locator
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a name-attribute locator
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create a link-text locator
    #[must_use]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    /// Lower to a CSS or XPath query
    #[must_use]
    pub fn query(&self) -> Query {
        match self {
            Self::Css(s) => Query::Css(s.clone()),
            Self::XPath(s) => Query::XPath(s.clone()),
            Self::Id(id) => Query::Css(format!("[id={}]", css_string(id))),
            Self::Name(name) => Query::Css(format!("[name={}]", css_string(name))),
            Self::LinkText(text) => {
                Query::XPath(format!("//a[normalize-space(.)={}]", xpath_string(text)))
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::Id(s) => write!(f, "id={s}"),
            Self::Name(s) => write!(f, "name={s}"),
            Self::LinkText(s) => write!(f, "link_text={s}"),
        }
    }
}

/// Quote a value for a CSS attribute selector
fn css_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Quote a value as an XPath string literal; XPath 1.0 has no escapes
fn xpath_string(value: &str) -> String {
    if !value.contains('"') {
        format!("\"{value}\"")
    } else if !value.contains('\'') {
        format!("'{value}'")
    } else {
        let parts: Vec<String> = value.split('"').map(|p| format!("\"{p}\"")).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}
