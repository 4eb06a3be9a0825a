use crate::{CrawlerError, FieldSpec, Property, Record};
use lazy_regex::regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::{Map, Value};

#[derive(Debug)]
struct Field {
    handle: String,
    node: String,
    selector: Selector,
    property: Property,
    children: Option<Vec<Field>>,
}

impl Field {
    fn compile(spec: &FieldSpec) -> Result<Field, CrawlerError> {
        let selector =
            Selector::parse(&spec.node).map_err(|e| CrawlerError::InvalidSelector {
                handle: spec.handle.clone(),
                selector: spec.node.clone(),
                reason: format!("{:?}", e),
            })?;

        let children = match &spec.children {
            Some(children) => Some(
                children
                    .iter()
                    .map(Field::compile)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };

        Ok(Field {
            handle: spec.handle.clone(),
            node: spec.node.clone(),
            selector,
            property: spec.action.clone(),
            children,
        })
    }
}

#[derive(Debug)]
pub struct Extractor {
    fields: Vec<Field>,
}

impl Extractor {
    pub fn new(specs: &[FieldSpec]) -> Result<Extractor, CrawlerError> {
        let fields = specs
            .iter()
            .map(Field::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Extractor { fields })
    }

    /// Each child of a repeated group produces its own single-key entry, so a
    /// container with two children adds two entries to the group.
    pub fn extract(&self, doc: &Html, base_url: &str) -> Result<Record, CrawlerError> {
        let mut record = Record::new();

        for field in &self.fields {
            let value = match &field.children {
                None => match doc.select(&field.selector).next() {
                    Some(el) => read_property(el, &field.property, base_url),
                    None => Value::Null,
                },
                Some(children) => {
                    let mut entries = vec![];
                    for container in doc.select(&field.selector) {
                        for child in children {
                            let el = container.select(&child.selector).next().ok_or_else(|| {
                                CrawlerError::MissingElement {
                                    handle: child.handle.clone(),
                                    selector: child.node.clone(),
                                }
                            })?;

                            let mut entry = Map::new();
                            entry.insert(
                                child.handle.clone(),
                                read_property(el, &child.property, base_url),
                            );
                            entries.push(Value::Object(entry));
                        }
                    }
                    Value::Array(entries)
                }
            };
            record.insert(field.handle.clone(), value);
        }

        Ok(record)
    }
}

fn read_property(el: ElementRef, property: &Property, base_url: &str) -> Value {
    match property {
        Property::TextContent => Value::String(el.text().collect()),
        Property::InnerText => Value::String(inner_text(el)),
        Property::InnerHtml => Value::String(el.inner_html()),
        Property::OuterHtml => Value::String(el.html()),
        Property::TagName => Value::String(el.value().name().to_uppercase()),
        Property::ClassName => attribute(el, "class"),
        Property::Link(name) => match el.value().attr(name) {
            Some(link) => Value::String(resolve(base_url, link.trim())),
            None => Value::Null,
        },
        Property::Attribute(name) => attribute(el, name),
    }
}

const HIDDEN: &[&str] = &["script", "style", "noscript", "template"];
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

fn inner_text(el: ElementRef) -> String {
    let mut text = String::new();
    push_inner_text(el, &mut text);
    text.split('\n')
        .map(|line| regex!(r" +").replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// Source whitespace becomes a space; '\n' only marks block and <br> breaks.
fn push_inner_text(el: ElementRef, text: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => text.push_str(&regex!(r"\s+").replace_all(t, " ")),
            Node::Element(e) => {
                let name = e.name();
                if HIDDEN.contains(&name) {
                    continue;
                }
                if name == "br" {
                    text.push('\n');
                    continue;
                }
                let block = BLOCK.contains(&name);
                if block {
                    text.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    push_inner_text(child_el, text);
                }
                if block {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn attribute(el: ElementRef, name: &str) -> Value {
    el.value()
        .attr(name)
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null)
}

fn resolve(base_url: &str, link: &str) -> String {
    match reqwest::Url::parse(base_url).and_then(|base| base.join(link)) {
        Ok(url) => url.to_string(),
        Err(_) => link.to_string(),
    }
}
