//! Markup Parser
//!
//! Builds the element tree from a template body with `roxmltree`. Before
//! the XML parser sees the body, HTML entities are rewritten to numeric
//! references, CDATA sections are set aside so they can be written back
//! verbatim, and the standard directive prefixes are bound on the root
//! element when the template leaves them undeclared.

use lazy_static::lazy_static;
use regex::Regex;

use super::ast::{Attribute, Document, Element, QName, Text};
use super::entities;
use super::namespaces::{is_known_root_namespace, DEFAULT_PREFIXES, META_NS, XML_NS};
use crate::error::{CompilerError, Result};
use crate::parse_util::ParseLocation;

const CDATA_TARGET: &str = "pagetemplate-cdata";

lazy_static! {
    static ref DOCTYPE: Regex = Regex::new(r"(?is)<!DOCTYPE\s[^>\[]*(\[.*?\]\s*)?>").unwrap();
    static ref TAG_NAME: Regex = Regex::new(r"^<([^\s/>]+)").unwrap();
}

#[derive(Debug, Default)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Parser
    }

    /// Parse an XML template body.
    pub fn parse(&self, body: &str) -> Result<Document> {
        let (protected, sections) = protect_cdata(body);
        let substituted = entities::substitute(&protected);
        let doctype = DOCTYPE
            .find(&substituted)
            .map(|found| found.as_str().to_string());
        let prepared = bind_default_prefixes(&substituted);

        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let tree = roxmltree::Document::parse_with_options(&prepared, options).map_err(|err| {
            CompilerError::ParseError {
                message: err.to_string(),
            }
        })?;

        let node = tree.root_element();
        if let Some(namespace) = node.tag_name().namespace() {
            if !is_known_root_namespace(namespace) {
                return Err(CompilerError::UnknownNamespace {
                    namespace: namespace.to_string(),
                });
            }
        }

        let builder = TreeBuilder {
            tree: &tree,
            source: &prepared,
            sections: &sections,
        };
        let root = builder.element(node);
        log::trace!("parsed template root <{}>", root.name);
        Ok(Document { root, doctype })
    }

    /// Wrap a plain-text body in an omitted root. Literal text is written
    /// unescaped; `${...}` interpolation still applies.
    pub fn parse_text(&self, body: &str) -> Document {
        let mut root = Element::new(QName::new(Some(META_NS), Some("meta"), "text"));
        root.text = Some(Text::new(body));
        Document {
            root,
            doctype: None,
        }
    }
}

struct TreeBuilder<'a, 'input> {
    tree: &'a roxmltree::Document<'input>,
    source: &'a str,
    sections: &'a [String],
}

impl<'a, 'input> TreeBuilder<'a, 'input> {
    fn location(&self, offset: usize) -> ParseLocation {
        let position = self.tree.text_pos_at(offset);
        ParseLocation::new(offset, position.row as usize, position.col as usize)
    }

    fn element(&self, node: roxmltree::Node) -> Element {
        let range = node.range();
        let tag = node.tag_name();
        let written = TAG_NAME
            .captures(&self.source[range.start..])
            .and_then(|captures| captures.get(1))
            .map_or(tag.name(), |name| name.as_str());
        let prefix = written.split_once(':').map(|(prefix, _)| prefix);

        let mut element = Element::new(QName::new(tag.namespace(), prefix, tag.name()));
        element.location = self.location(range.start);
        element.namespaces = declared_namespaces(node);
        element.attributes = node
            .attributes()
            .map(|attribute| {
                let prefix = attribute.namespace().and_then(|uri| {
                    if uri == XML_NS {
                        return Some("xml");
                    }
                    node.namespaces()
                        .filter(|namespace| namespace.uri() == uri)
                        .find_map(|namespace| namespace.name())
                });
                Attribute {
                    name: QName::new(attribute.namespace(), prefix, attribute.name()),
                    value: attribute.value().to_string(),
                }
            })
            .collect();

        for child in node.children() {
            if child.is_element() {
                element.children.push(self.element(child));
            } else if child.is_text() {
                append_text(&mut element, Text::new(child.text().unwrap_or_default()));
            } else if let Some(markup) = self.literal(child) {
                element
                    .children
                    .push(Element::literal(markup, self.location(child.range().start)));
            }
        }
        element
    }

    /// The markup of a comment, processing instruction or set-aside CDATA
    /// section.
    fn literal(&self, node: roxmltree::Node) -> Option<String> {
        if node.is_comment() {
            return Some(format!("<!--{}-->", node.text().unwrap_or_default()));
        }
        let pi = node.pi()?;
        if pi.target == CDATA_TARGET {
            let index: usize = pi.value?.trim().parse().ok()?;
            return self
                .sections
                .get(index)
                .map(|section| format!("<![CDATA[{}]]>", section));
        }
        Some(match pi.value {
            Some(value) => format!("<?{} {}?>", pi.target, value),
            None => format!("<?{}?>", pi.target),
        })
    }
}

/// Append text after the last child, or as leading text when there is
/// none yet.
fn append_text(element: &mut Element, text: Text) {
    let slot = match element.children.last_mut() {
        Some(child) => &mut child.tail,
        None => &mut element.text,
    };
    match slot {
        Some(existing) => existing.value.push_str(&text.value),
        None => *slot = Some(text),
    }
}

/// Namespace declarations introduced by `node` itself.
fn declared_namespaces(node: roxmltree::Node) -> Vec<(Option<String>, String)> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| {
            parent
                .namespaces()
                .map(|namespace| (namespace.name(), namespace.uri()))
                .collect()
        })
        .unwrap_or_default();
    node.namespaces()
        .filter(|namespace| namespace.uri() != XML_NS)
        .filter(|namespace| !inherited.contains(&(namespace.name(), namespace.uri())))
        .map(|namespace| (namespace.name().map(str::to_string), namespace.uri().to_string()))
        .collect()
}

/// Replace CDATA sections with numbered processing instructions. Comments
/// are skipped so a `<![CDATA[` inside one is left alone.
fn protect_cdata(body: &str) -> (String, Vec<String>) {
    let mut output = String::with_capacity(body.len());
    let mut sections = Vec::new();
    let mut rest = body;
    loop {
        let comment = rest.find("<!--");
        let cdata = rest.find("<![CDATA[");
        match (comment, cdata) {
            (Some(start), cdata) if cdata.map_or(true, |cdata| start < cdata) => {
                let end = rest[start..]
                    .find("-->")
                    .map_or(rest.len(), |end| start + end + 3);
                output.push_str(&rest[..end]);
                rest = &rest[end..];
            }
            (_, Some(start)) => {
                let content = &rest[start + 9..];
                let Some(end) = content.find("]]>") else {
                    // Unterminated; leave it for the XML parser to report.
                    output.push_str(rest);
                    break;
                };
                output.push_str(&rest[..start]);
                output.push_str(&format!("<?{} {}?>", CDATA_TARGET, sections.len()));
                sections.push(content[..end].to_string());
                rest = &content[end + 3..];
            }
            _ => {
                output.push_str(rest);
                break;
            }
        }
    }
    (output, sections)
}

/// Offset just past the root element's tag name.
fn root_tag_end(body: &str) -> Option<usize> {
    let mut offset = 0;
    loop {
        let rest = &body[offset..];
        let trimmed = rest.trim_start();
        offset += rest.len() - trimmed.len();
        if trimmed.starts_with("<?") {
            offset += trimmed.find("?>")? + 2;
        } else if trimmed.starts_with("<!--") {
            offset += trimmed.find("-->")? + 3;
        } else if trimmed.starts_with("<!") {
            let declaration = DOCTYPE
                .find(trimmed)
                .filter(|found| found.start() == 0)
                .map(|found| found.end())
                .or_else(|| trimmed.find('>').map(|end| end + 1))?;
            offset += declaration;
        } else if trimmed.starts_with('<') {
            let name = TAG_NAME.captures(trimmed)?.get(1)?;
            return Some(offset + name.end());
        } else {
            return None;
        }
    }
}

/// Declare the standard prefixes the template did not declare itself.
fn bind_default_prefixes(body: &str) -> std::borrow::Cow<'_, str> {
    let missing: String = DEFAULT_PREFIXES
        .iter()
        .filter(|(prefix, _)| !body.contains(&format!("xmlns:{}=", prefix)))
        .map(|(prefix, uri)| format!(" xmlns:{}=\"{}\"", prefix, uri))
        .collect();
    match root_tag_end(body) {
        Some(end) if !missing.is_empty() => {
            let mut prepared = String::with_capacity(body.len() + missing.len());
            prepared.push_str(&body[..end]);
            prepared.push_str(&missing);
            prepared.push_str(&body[end..]);
            prepared.into()
        }
        _ => body.into(),
    }
}
