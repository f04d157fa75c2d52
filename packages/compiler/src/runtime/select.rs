//! Matched element snapshots handed to `py:match` templates.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::value::{HostObject, Kwargs, Value};
use crate::error::EvalError;
use crate::ml_parser::{content_markup, to_markup, Element};

/// A static copy of one matched element. Inside a match template it is
/// bound to `select`, which is called with a path such as `text()`,
/// `*|text()` or `@href`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub markup: String,
    pub content: String,
    pub text: String,
    pub children: Vec<Selection>,
    pub attributes: IndexMap<String, String>,
}

impl Selection {
    pub fn of(element: &Element) -> Self {
        Selection {
            markup: to_markup(element),
            content: content_markup(element),
            text: text_of(element),
            children: element
                .children
                .iter()
                .filter(|child| !child.is_literal())
                .map(Selection::of)
                .collect(),
            attributes: element
                .attributes
                .iter()
                .map(|attribute| (attribute.name.qualified(), attribute.value.clone()))
                .collect(),
        }
    }

    pub fn select(&self, path: &str) -> Result<Value, EvalError> {
        let path = path.trim();
        Ok(match path {
            "" | "." => Value::markup(&self.markup),
            "*|text()" | "node()" => Value::markup(&self.content),
            "text()" => Value::str(&self.text),
            "*" => Value::list(
                self.children
                    .iter()
                    .map(|child| Value::object(child.clone()))
                    .collect(),
            ),
            _ => match path.strip_prefix('@') {
                Some(name) => self
                    .attributes
                    .get(name)
                    .map(Value::str)
                    .unwrap_or(Value::None),
                None => {
                    return Err(EvalError::type_error(format!(
                        "unsupported selection path `{}`",
                        path
                    )))
                }
            },
        })
    }
}

/// Text of `element` and its descendants, without markup.
fn text_of(element: &Element) -> String {
    let mut text = String::new();
    if !element.is_literal() {
        if let Some(own) = &element.text {
            text.push_str(&own.value);
        }
    }
    for child in &element.children {
        text.push_str(&text_of(child));
        if let Some(tail) = &child.tail {
            text.push_str(&tail.value);
        }
    }
    text
}

impl HostObject for Selection {
    fn type_name(&self) -> &str {
        "Selection"
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).map(Value::str)
    }

    fn call(&self, args: Vec<Value>, _kwargs: Kwargs) -> Option<Result<Value, EvalError>> {
        Some(match args.as_slice() {
            [] => Ok(Value::markup(&self.markup)),
            [Value::Str(path)] => self.select(path),
            _ => Err(EvalError::type_error(
                "select() takes a single path argument",
            )),
        })
    }

    fn to_text(&self) -> String {
        self.markup.clone()
    }
}
