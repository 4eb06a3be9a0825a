use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// One extracted page: field handle to a string, `null`, or a list of
/// single-key sub-records. Keys keep their insertion order.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UrlEntry {
    pub url: String,
    #[serde(default)]
    pub date: Value,
}

/// A declarative field. With `children` it is a repeated group: `node`
/// selects the containers and every child is resolved inside each one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSpec {
    pub handle: String,
    pub node: String,
    pub action: Property,
    #[serde(default)]
    pub children: Option<Vec<FieldSpec>>,
}

/// The DOM property an extraction reads from a matched element.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Property {
    TextContent,
    InnerText,
    InnerHtml,
    OuterHtml,
    TagName,
    ClassName,
    /// Attribute holding a URL; the DOM property resolves it against the page.
    Link(String),
    Attribute(String),
}

impl From<String> for Property {
    fn from(s: String) -> Self {
        match s.as_str() {
            "textContent" => Property::TextContent,
            "innerText" => Property::InnerText,
            "innerHTML" => Property::InnerHtml,
            "outerHTML" => Property::OuterHtml,
            "tagName" | "nodeName" => Property::TagName,
            "className" => Property::ClassName,
            "href" | "src" | "action" => Property::Link(s),
            _ => Property::Attribute(s),
        }
    }
}

impl From<&str> for Property {
    fn from(s: &str) -> Self {
        Property::from(s.to_string())
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::TextContent => write!(f, "textContent"),
            Property::InnerText => write!(f, "innerText"),
            Property::InnerHtml => write!(f, "innerHTML"),
            Property::OuterHtml => write!(f, "outerHTML"),
            Property::TagName => write!(f, "tagName"),
            Property::ClassName => write!(f, "className"),
            Property::Link(name) | Property::Attribute(name) => write!(f, "{}", name),
        }
    }
}
