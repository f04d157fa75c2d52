//! Macro access from templates.
//!
//! `use-macro` evaluates its expression and calls the result with the
//! caller's variables and the filled slots as keyword arguments. These
//! objects make a template's macros look up and call that way.

use super::page_template::PageTemplate;
use crate::error::EvalError;
use crate::runtime::{HostObject, Kwargs, Value};

/// The macros of one template, looked up by name.
#[derive(Debug, Clone)]
pub struct Macros {
    template: PageTemplate,
}

impl Macros {
    pub fn new(template: PageTemplate) -> Self {
        Macros { template }
    }

    pub fn get(&self, name: &str) -> Option<MacroRef> {
        self.template.has_macro(name).then(|| MacroRef {
            template: self.template.clone(),
            name: name.to_string(),
        })
    }
}

impl HostObject for Macros {
    fn type_name(&self) -> &str {
        "Macros"
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        self.get(name).map(Value::object)
    }

    fn get_item(&self, key: &Value) -> Option<Value> {
        key.as_str().and_then(|name| self.get_attr(name))
    }

    fn iterate(&self) -> Option<Box<dyn Iterator<Item = Value> + Send>> {
        let names: Vec<Value> = self.template.macro_names().into_iter().map(Value::str).collect();
        Some(Box::new(names.into_iter()))
    }

    fn len(&self) -> Option<usize> {
        Some(self.template.macro_names().len())
    }
}

/// A callable reference to one macro. Calling it renders the macro with
/// the keyword arguments as parameters and returns markup.
#[derive(Debug, Clone)]
pub struct MacroRef {
    template: PageTemplate,
    name: String,
}

impl MacroRef {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl HostObject for MacroRef {
    fn type_name(&self) -> &str {
        "Macro"
    }

    fn call(&self, args: Vec<Value>, kwargs: Kwargs) -> Option<Result<Value, EvalError>> {
        if !args.is_empty() {
            return Some(Err(EvalError::type_error(format!(
                "macro '{}' takes keyword arguments only",
                self.name
            ))));
        }
        Some(
            self.template
                .render_macro(&self.name, kwargs)
                .map(Value::markup)
                .map_err(|err| EvalError::Template(Box::new(err))),
        )
    }

    fn to_text(&self) -> String {
        format!("<macro {}>", self.name)
    }
}
