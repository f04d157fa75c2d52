//! Message ids for `i18n:translate` blocks without an explicit one.

use crate::ml_parser::{to_markup, Element, I18N_NS};
use crate::runtime::i18n::normalize_msgid;

/// The `i18n:name` of `element`, if any.
pub fn translation_name(element: &Element) -> Option<&str> {
    element
        .attribute(Some(I18N_NS), "name")
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Build a message id from the element's content: text and unnamed
/// children are kept as markup, each named child becomes `${name}`.
pub fn create_msgid(element: &Element) -> String {
    let mut msgid = String::new();
    if let Some(text) = &element.text {
        msgid.push_str(&text.value);
    }
    for child in &element.children {
        match translation_name(child) {
            Some(name) => {
                msgid.push_str("${");
                msgid.push_str(name);
                msgid.push('}');
            }
            None => msgid.push_str(&to_markup(child)),
        }
        if let Some(tail) = &child.tail {
            msgid.push_str(&tail.value);
        }
    }
    normalize_msgid(&msgid)
}
