//! Markup serialization of static subtrees, used when a message id is
//! synthesized from an element's content.

use super::ast::{Element, Text};
use super::namespaces::is_directive_namespace;
use crate::runtime::escape::{escape_attribute, escape_text};

/// Serialize `element` without directive attributes. Elements in a
/// directive namespace contribute their content only.
pub fn to_markup(element: &Element) -> String {
    let mut output = String::new();
    write_element(&mut output, element);
    output
}

/// Serialize the text and children of `element` without its own tag.
pub fn content_markup(element: &Element) -> String {
    let mut output = String::new();
    write_text(&mut output, &element.text);
    for child in &element.children {
        write_element(&mut output, child);
        write_text(&mut output, &child.tail);
    }
    output
}

fn write_text(output: &mut String, text: &Option<Text>) {
    if let Some(text) = text {
        if text.verbatim {
            output.push_str(&text.value);
        } else {
            output.push_str(&escape_text(&text.value));
        }
    }
}

fn write_element(output: &mut String, element: &Element) {
    if element.is_literal() {
        write_text(output, &element.text);
        return;
    }
    let tag = element.is_markup().then(|| element.name.qualified());
    if let Some(tag) = &tag {
        output.push('<');
        output.push_str(tag);
        for attribute in &element.attributes {
            if attribute
                .name
                .namespace
                .as_deref()
                .map_or(false, is_directive_namespace)
            {
                continue;
            }
            output.push_str(&format!(
                " {}=\"{}\"",
                attribute.name.qualified(),
                escape_attribute(&attribute.value)
            ));
        }
        if !element.has_text() && element.children.is_empty() {
            output.push_str(" />");
            return;
        }
        output.push('>');
    }
    output.push_str(&content_markup(element));
    if let Some(tag) = &tag {
        output.push_str(&format!("</{}>", tag));
    }
}
