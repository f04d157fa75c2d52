//! Directive Table
//!
//! One pass over an element's attributes sorts them into directives, keyed
//! by a closed enum, and pass-through markup attributes. Attributes in a
//! directive namespace that name no known directive are rejected here.

use indexmap::IndexMap;

use crate::error::{CompilerError, Result};
use crate::ml_parser::{
    is_directive_namespace, Element, I18N_NS, META_NS, METAL_NS, PY_NS, TAL_NS, XI_NS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Define,
    Condition,
    Repeat,
    Content,
    Replace,
    Attributes,
    OmitTag,
    DefaultExpression,
    DefineMacro,
    UseMacro,
    FillSlot,
    DefineSlot,
    Translate,
    TranslateAttributes,
    Domain,
    Name,
    Interpolation,
    If,
    For,
    With,
    Def,
    PyContent,
    PyReplace,
    Strip,
    AttributeMap,
    Choose,
    When,
    Otherwise,
    Match,
}

/// The directive dialect an attribute belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Tal,
    Metal,
    I18n,
    Meta,
    Py,
}

impl Dialect {
    fn from_namespace(namespace: &str) -> Option<Self> {
        match namespace {
            TAL_NS => Some(Dialect::Tal),
            METAL_NS => Some(Dialect::Metal),
            I18N_NS => Some(Dialect::I18n),
            META_NS => Some(Dialect::Meta),
            PY_NS => Some(Dialect::Py),
            _ => None,
        }
    }

    fn directive(self, local: &str) -> Option<Directive> {
        use Directive::*;
        Some(match (self, local) {
            (Dialect::Tal, "define") => Define,
            (Dialect::Tal, "condition") => Condition,
            (Dialect::Tal, "repeat") => Repeat,
            (Dialect::Tal, "content") => Content,
            (Dialect::Tal, "replace") => Replace,
            (Dialect::Tal, "attributes") => Attributes,
            (Dialect::Tal, "omit-tag") => OmitTag,
            (Dialect::Tal, "default-expression") => DefaultExpression,
            (Dialect::Metal, "define-macro") => DefineMacro,
            (Dialect::Metal, "use-macro") => UseMacro,
            (Dialect::Metal, "fill-slot") => FillSlot,
            (Dialect::Metal, "define-slot") => DefineSlot,
            (Dialect::I18n, "translate") => Translate,
            (Dialect::I18n, "attributes") => TranslateAttributes,
            (Dialect::I18n, "domain") => Domain,
            (Dialect::I18n, "name") => Name,
            (Dialect::Meta, "replace") => Replace,
            (Dialect::Meta, "omit-tag") => OmitTag,
            (Dialect::Meta, "attributes") => Attributes,
            (Dialect::Meta, "interpolation") => Interpolation,
            (Dialect::Py, "if") => If,
            (Dialect::Py, "for") => For,
            (Dialect::Py, "with") => With,
            (Dialect::Py, "def") => Def,
            (Dialect::Py, "content") => PyContent,
            (Dialect::Py, "replace") => PyReplace,
            (Dialect::Py, "strip") => Strip,
            (Dialect::Py, "attrs") => AttributeMap,
            (Dialect::Py, "choose") => Choose,
            (Dialect::Py, "when") => When,
            (Dialect::Py, "otherwise") => Otherwise,
            (Dialect::Py, "match") => Match,
            _ => return None,
        })
    }
}

/// Pairs of directives that may not appear on the same element.
const CONFLICTS: &[(Directive, Directive)] = &[
    (Directive::Content, Directive::Replace),
    (Directive::PyContent, Directive::PyReplace),
    (Directive::Content, Directive::PyReplace),
    (Directive::PyContent, Directive::Replace),
    (Directive::Repeat, Directive::For),
    (Directive::Condition, Directive::If),
    (Directive::UseMacro, Directive::Content),
    (Directive::UseMacro, Directive::Replace),
    (Directive::When, Directive::Otherwise),
    (Directive::Def, Directive::Match),
];

#[derive(Debug, Clone)]
struct Entry {
    attribute: String,
    value: String,
}

/// The directives and pass-through attributes of one element.
#[derive(Debug, Clone, Default)]
pub struct DirectiveTable {
    entries: IndexMap<Directive, Entry>,
    /// Markup attributes in source order: qualified name and value.
    pub statics: Vec<(String, String)>,
    /// `href` and `parse` of an `xi:include` element.
    pub include: Option<(String, String)>,
}

impl DirectiveTable {
    pub fn parse(element: &Element) -> Result<Self> {
        let mut table = DirectiveTable::default();
        let element_name = element.name.qualified();
        // Unprefixed attributes on a directive element belong to its dialect.
        let owner = element
            .name
            .namespace
            .as_deref()
            .and_then(Dialect::from_namespace);

        if element.name.is(XI_NS, "include") {
            let href = element.attribute(None, "href").ok_or_else(|| {
                CompilerError::syntax("Missing `href` on xi:include").in_context(
                    None,
                    &element_name,
                    Some(element.location),
                )
            })?;
            let parse = element.attribute(None, "parse").unwrap_or("xml");
            table.include = Some((href.to_string(), parse.to_string()));
            return Ok(table);
        }

        for attribute in &element.attributes {
            let qualified = attribute.name.qualified();
            let dialect = match attribute.name.namespace.as_deref() {
                Some(namespace) => Dialect::from_namespace(namespace),
                None => owner,
            };
            let Some(dialect) = dialect else {
                if attribute
                    .name
                    .namespace
                    .as_deref()
                    .map_or(false, is_directive_namespace)
                {
                    return Err(CompilerError::UnknownDirective {
                        element: element_name,
                        attribute: qualified,
                    });
                }
                table.statics.push((qualified, attribute.value.clone()));
                continue;
            };
            let directive =
                dialect
                    .directive(&attribute.name.local)
                    .ok_or_else(|| CompilerError::UnknownDirective {
                        element: element_name.clone(),
                        attribute: qualified.clone(),
                    })?;
            table.insert(directive, qualified, attribute.value.clone(), &element_name)?;
        }

        for (first, second) in CONFLICTS {
            if let (Some(a), Some(b)) = (table.entries.get(first), table.entries.get(second)) {
                return Err(CompilerError::ConflictingDirectives {
                    element: element_name,
                    first: a.attribute.clone(),
                    second: b.attribute.clone(),
                });
            }
        }
        Ok(table)
    }

    fn insert(
        &mut self,
        directive: Directive,
        attribute: String,
        value: String,
        element: &str,
    ) -> Result<()> {
        match self.entries.get_mut(&directive) {
            // `tal:attributes` and `meta:attributes` combine.
            Some(existing) if directive == Directive::Attributes => {
                existing.value = format!("{}; {}", existing.value, value);
                Ok(())
            }
            Some(existing) => Err(CompilerError::ConflictingDirectives {
                element: element.to_string(),
                first: existing.attribute.clone(),
                second: attribute,
            }),
            None => {
                self.entries.insert(directive, Entry { attribute, value });
                Ok(())
            }
        }
    }

    pub fn get(&self, directive: Directive) -> Option<&str> {
        self.entries.get(&directive).map(|entry| entry.value.as_str())
    }

    /// The attribute name a directive was written as, for error context.
    pub fn attribute(&self, directive: Directive) -> Option<&str> {
        self.entries
            .get(&directive)
            .map(|entry| entry.attribute.as_str())
    }

    pub fn contains(&self, directive: Directive) -> bool {
        self.entries.contains_key(&directive)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
