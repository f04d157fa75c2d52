//! Markup AST
//!
//! The element tree the compiler walks. Text follows the lxml layout: an
//! element owns the text before its first child, and every child owns the
//! text that follows it up to the next sibling (its tail).

use std::fmt;

use super::namespaces::{META_NS, XHTML_NS};
use crate::parse_util::ParseLocation;

/// A namespace-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: Option<String>,
    /// Prefix the name was written with in the source.
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, prefix: Option<&str>, local: &str) -> Self {
        QName {
            namespace: namespace.map(str::to_string),
            prefix: prefix.filter(|prefix| !prefix.is_empty()).map(str::to_string),
            local: local.to_string(),
        }
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local == local
    }

    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }

    /// The name as written in the output markup.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    /// The decoded attribute value.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Text {
    pub value: String,
    /// Written as-is: no escaping and no interpolation.
    pub verbatim: bool,
}

impl Text {
    pub fn new(value: impl Into<String>) -> Self {
        Text {
            value: value.into(),
            verbatim: false,
        }
    }

    pub fn verbatim(value: impl Into<String>) -> Self {
        Text {
            value: value.into(),
            verbatim: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    pub attributes: Vec<Attribute>,
    /// `xmlns` declarations made on this element: prefix (or `None` for the
    /// default namespace) and URI.
    pub namespaces: Vec<(Option<String>, String)>,
    pub text: Option<Text>,
    pub children: Vec<Element>,
    pub tail: Option<Text>,
    pub location: ParseLocation,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Element {
            name,
            attributes: Vec::new(),
            namespaces: Vec::new(),
            text: None,
            children: Vec::new(),
            tail: None,
            location: ParseLocation::default(),
        }
    }

    /// A pseudo-element standing for markup copied to the output unchanged:
    /// comments, processing instructions and CDATA sections.
    pub fn literal(markup: impl Into<String>, location: ParseLocation) -> Self {
        Element {
            text: Some(Text::verbatim(markup)),
            location,
            ..Element::new(QName::new(Some(META_NS), Some("meta"), "literal"))
        }
    }

    pub fn is_literal(&self) -> bool {
        self.name.is(META_NS, "literal")
    }

    pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| {
                attribute.name.namespace.as_deref() == namespace && attribute.name.local == local
            })
            .map(|attribute| attribute.value.as_str())
    }

    /// Whether this element is plain markup, as opposed to a directive
    /// namespace element such as `<tal:block>`.
    pub fn is_markup(&self) -> bool {
        match self.name.namespace.as_deref() {
            None => true,
            Some(namespace) => namespace == XHTML_NS || !super::is_directive_namespace(namespace),
        }
    }

    pub fn has_text(&self) -> bool {
        self.text.as_ref().map_or(false, |text| !text.is_empty())
    }

    /// Depth-first iterator over this element and all descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
    /// The doctype declaration, verbatim.
    pub doctype: Option<String>,
}
