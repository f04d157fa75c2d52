//! Value Expressions
//!
//! The compiled-but-not-yet-emitted form of an attribute expression, as
//! produced by the expression translators and consumed by clauses.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::expression_parser::Expr;

/// Runtime helpers a program may call. Each is bound by the executor to the
/// service that implements it for the current render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// Path traversal.
    Traverse,
    /// Path existence test.
    Exists,
    /// Content-provider lookup and rendering.
    ContentProvider,
    /// Message translation.
    Translate,
    /// Per-render "not found" sentinel.
    Marker,
    /// External template inclusion.
    Include,
}

/// Names the generated code needs bound to runtime helpers.
pub type SymbolMapping = IndexMap<String, Symbol>;

/// A single expression plus the helpers it references.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub expr: Expr,
    /// Original source text, used for annotations and listings.
    pub source: String,
    pub symbol_mapping: SymbolMapping,
}

impl Value {
    pub fn new(expr: Expr, source: impl Into<String>) -> Self {
        Value {
            expr,
            source: source.into(),
            symbol_mapping: SymbolMapping::new(),
        }
    }

    pub fn with_symbol(mut self, name: impl Into<String>, symbol: Symbol) -> Self {
        self.symbol_mapping.insert(name.into(), symbol);
        self
    }

    pub fn with_symbols(mut self, symbols: &SymbolMapping) -> Self {
        for (name, symbol) in symbols {
            self.symbol_mapping.insert(name.clone(), *symbol);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinPart {
    Literal(String),
    Value(ValueExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    Value(Value),
    /// Alternatives tried in order; the first that evaluates wins.
    Parts(Vec<ValueExpr>),
    /// Text concatenation of literal fragments and values.
    Join(Vec<JoinPart>),
    /// Output of the wrapped value must be HTML-escaped.
    Escape(Box<ValueExpr>),
}

impl ValueExpr {
    pub fn value(expr: Expr, source: impl Into<String>) -> Self {
        ValueExpr::Value(Value::new(expr, source))
    }

    /// The `None` sentinel used for empty optional expressions.
    pub fn none() -> Self {
        ValueExpr::value(Expr::none(), "None")
    }

    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        let source = crate::expression_parser::serializer::quote(&text);
        ValueExpr::value(Expr::str(text), source)
    }

    pub fn name(name: &str) -> Self {
        ValueExpr::value(Expr::name(name), name)
    }

    /// Build `Parts`, collapsing a single alternative and flattening nested
    /// alternatives.
    pub fn parts(alternatives: Vec<ValueExpr>) -> Self {
        let mut flat = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            match alternative {
                ValueExpr::Parts(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            ValueExpr::Parts(flat)
        }
    }

    pub fn escape(self) -> Self {
        match self {
            ValueExpr::Escape(_) => self,
            other => ValueExpr::Escape(Box::new(other)),
        }
    }

    pub fn is_escaped(&self) -> bool {
        matches!(self, ValueExpr::Escape(_))
    }

    /// The value with any escape wrapper removed.
    pub fn unwrap_escape(&self) -> &ValueExpr {
        match self {
            ValueExpr::Escape(inner) => inner.unwrap_escape(),
            other => other,
        }
    }

    /// The plain expression, when this is a single value.
    pub fn as_expr(&self) -> Option<&Expr> {
        match self.unwrap_escape() {
            ValueExpr::Value(value) => Some(&value.expr),
            _ => None,
        }
    }

    /// Source text describing this value, for annotations.
    pub fn source(&self) -> String {
        match self {
            ValueExpr::Value(value) => value.source.clone(),
            ValueExpr::Parts(parts) => parts
                .iter()
                .map(ValueExpr::source)
                .collect::<Vec<_>>()
                .join(" | "),
            ValueExpr::Join(parts) => parts
                .iter()
                .map(|part| match part {
                    JoinPart::Literal(text) => text.clone(),
                    JoinPart::Value(value) => format!("${{{}}}", value.source()),
                })
                .collect(),
            ValueExpr::Escape(inner) => inner.source(),
        }
    }

    /// Every symbol referenced anywhere inside this value.
    pub fn collect_symbols(&self, into: &mut SymbolMapping) {
        match self {
            ValueExpr::Value(value) => {
                for (name, symbol) in &value.symbol_mapping {
                    into.insert(name.clone(), *symbol);
                }
            }
            ValueExpr::Parts(parts) => parts.iter().for_each(|part| part.collect_symbols(into)),
            ValueExpr::Join(parts) => {
                for part in parts {
                    if let JoinPart::Value(value) = part {
                        value.collect_symbols(into);
                    }
                }
            }
            ValueExpr::Escape(inner) => inner.collect_symbols(into),
        }
    }
}

/// Target variable names of a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub names: SmallVec<[String; 2]>,
    /// Bind in the execution scope instead of shadowing lexically.
    pub global_scope: bool,
}

impl Declaration {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Declaration {
            names: names.into_iter().map(Into::into).collect(),
            global_scope: false,
        }
    }

    pub fn global<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Declaration {
            global_scope: true,
            ..Declaration::new(names)
        }
    }

    pub fn is_unpacking(&self) -> bool {
        self.names.len() > 1
    }
}
