//! Expression Translators
//!
//! Pluggable dialects that validate attribute expressions and translate
//! them into value expressions. The registry implements the compound
//! syntax shared by every dialect: `|`-separated fallbacks and `pragma:`
//! prefixes selecting another dialect for one alternative.

pub mod definitions;
pub mod native;
pub mod path;
pub mod pragmas;
pub mod string;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::config::Symbols;
use crate::error::{CompilerError, Result};
use crate::output::{JoinPart, Value, ValueExpr};

pub use native::NativeTranslator;
pub use path::PathTranslator;
pub use pragmas::{ExistsTranslator, NocallTranslator, NotTranslator, ProviderTranslator};
pub use string::StringTranslator;

static PRAGMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([a-z][a-z0-9_\-]*):").unwrap());

/// A single expression dialect.
pub trait ExpressionTranslator: Send + Sync {
    fn name(&self) -> &str;

    /// Fail with a syntax error unless `source` is well-formed in this
    /// dialect.
    fn validate(&self, source: &str) -> Result<()>;

    /// Translate an already validated expression. `registry` and `dialect`
    /// are the context for nested expressions.
    fn translate(
        &self,
        source: &str,
        registry: &TranslatorRegistry,
        dialect: &str,
    ) -> Result<ValueExpr>;

    /// Whether this dialect consumes the rest of a compound expression,
    /// `|` included.
    fn consumes_remainder(&self) -> bool {
        false
    }
}

/// The set of dialects available to a template.
#[derive(Clone)]
pub struct TranslatorRegistry {
    pub symbols: Symbols,
    translators: IndexMap<String, Arc<dyn ExpressionTranslator>>,
}

impl std::fmt::Debug for TranslatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorRegistry")
            .field("translators", &self.translators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for TranslatorRegistry {
    fn default() -> Self {
        TranslatorRegistry::new(Symbols::default())
    }
}

impl TranslatorRegistry {
    /// A registry with the standard dialects.
    pub fn new(symbols: Symbols) -> Self {
        let mut registry = TranslatorRegistry {
            translators: IndexMap::new(),
            symbols: symbols.clone(),
        };
        let native: Arc<dyn ExpressionTranslator> = Arc::new(NativeTranslator::new());
        registry.register(PathTranslator::new(symbols.clone()));
        registry.register_as("native", Arc::clone(&native));
        registry.register_as("python", native);
        registry.register(StringTranslator);
        registry.register(NotTranslator);
        registry.register(NocallTranslator::new(symbols.clone()));
        registry.register(ExistsTranslator::new(symbols.clone()));
        registry.register(ProviderTranslator::new(symbols));
        registry
    }

    pub fn register<T: ExpressionTranslator + 'static>(&mut self, translator: T) {
        let name = translator.name().to_string();
        self.translators.insert(name, Arc::new(translator));
    }

    pub fn register_as(&mut self, name: &str, translator: Arc<dyn ExpressionTranslator>) {
        self.translators.insert(name.to_string(), translator);
    }

    pub fn get(&self, name: &str) -> Result<&dyn ExpressionTranslator> {
        self.translators
            .get(name)
            .map(|translator| translator.as_ref())
            .ok_or_else(|| CompilerError::syntax(format!("Unknown expression type: {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.translators.contains_key(name)
    }

    /// Translate a compound expression in `dialect`. An empty expression
    /// yields the `None` sentinel.
    pub fn compile(&self, source: &str, dialect: &str) -> Result<ValueExpr> {
        let source = source.trim();
        if source.is_empty() {
            return Ok(ValueExpr::none());
        }
        Ok(ValueExpr::parts(self.split(source, dialect)?))
    }

    /// Check that a compound expression translates, discarding the result.
    pub fn validate(&self, source: &str, dialect: &str) -> Result<()> {
        self.split(source.trim(), dialect).map(|_| ())
    }

    /// Resolve the pragma of one alternative.
    fn select<'s>(
        &self,
        source: &'s str,
        dialect: &str,
    ) -> Result<(&dyn ExpressionTranslator, &'s str)> {
        if let Some(captures) = PRAGMA.captures(source) {
            let name = captures.get(1).map_or("", |m| m.as_str());
            let end = captures.get(0).map_or(0, |m| m.end());
            return Ok((self.get(name)?, &source[end..]));
        }
        Ok((self.get(dialect)?, source))
    }

    /// Split on unescaped `|` and translate each alternative. A candidate
    /// that does not translate is extended to the next separator, so `|`
    /// inside a string literal or a nested pragma is left alone.
    fn split(&self, source: &str, dialect: &str) -> Result<Vec<ValueExpr>> {
        let separators: Vec<usize> = source
            .char_indices()
            .filter(|(i, c)| *c == '|' && !source[..*i].ends_with('\\'))
            .map(|(i, _)| i)
            .chain(std::iter::once(source.len()))
            .collect();

        let mut alternatives = Vec::new();
        let mut start = 0;
        let mut k = 0;
        while start < source.len() {
            let (translator, rest) = self.select(source[start..].trim_start(), dialect)?;
            if translator.consumes_remainder() {
                let expression = unescape_pipes(rest.trim());
                translator.validate(&expression)?;
                alternatives.push(translator.translate(&expression, self, dialect)?);
                break;
            }

            loop {
                let end = separators[k];
                let candidate = &source[start..end];
                let (translator, rest) = self.select(candidate.trim_start(), dialect)?;
                let expression = unescape_pipes(rest.trim());
                let translated = translator
                    .validate(&expression)
                    .and_then(|()| translator.translate(&expression, self, dialect));
                match translated {
                    Ok(value) => {
                        alternatives.push(value);
                        start = (end + 1).min(source.len());
                        k += 1;
                        break;
                    }
                    Err(_) if k + 1 < separators.len() => k += 1,
                    Err(err) => return Err(err),
                }
            }
            if k >= separators.len() {
                break;
            }
        }
        Ok(alternatives)
    }
}

fn unescape_pipes(source: &str) -> String {
    source.replace("\\|", "|")
}

/// Strip a `structure ` or `text ` prefix from a content expression.
/// Returns whether the value is structure (written without escaping).
pub fn split_content_prefix(source: &str) -> (bool, &str) {
    let trimmed = source.trim_start();
    for (prefix, structure) in [("structure ", true), ("text ", false)] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return (structure, rest);
        }
    }
    (false, source)
}

/// Translate every `${...}` in `text` against `dialect`. Returns `None`
/// when the text holds no interpolation.
pub fn interpolate(
    text: &str,
    registry: &TranslatorRegistry,
    dialect: &str,
) -> Result<Option<ValueExpr>> {
    if !text.contains("${") {
        return Ok(None);
    }
    let parts = string::scan(text, registry, dialect, false)?;
    if parts.iter().all(|part| matches!(part, JoinPart::Literal(_))) {
        return Ok(None);
    }
    Ok(Some(ValueExpr::Join(parts)))
}

/// Wrap `value` so it applies `wrap` to the expression of every alternative.
pub(crate) fn map_value(
    value: ValueExpr,
    wrap: &impl Fn(crate::expression_parser::Expr) -> crate::expression_parser::Expr,
) -> Result<ValueExpr> {
    Ok(match value {
        ValueExpr::Value(Value {
            expr,
            source,
            symbol_mapping,
        }) => ValueExpr::Value(Value::new(wrap(expr), source).with_symbols(&symbol_mapping)),
        ValueExpr::Parts(parts) => ValueExpr::Parts(
            parts
                .into_iter()
                .map(|part| map_value(part, wrap))
                .collect::<Result<_>>()?,
        ),
        ValueExpr::Escape(inner) => ValueExpr::Escape(Box::new(map_value(*inner, wrap)?)),
        ValueExpr::Join(parts) => {
            let source = ValueExpr::Join(parts.clone()).source();
            let mut exprs = Vec::with_capacity(parts.len());
            let mut symbols = crate::output::SymbolMapping::new();
            for part in parts {
                match part {
                    JoinPart::Literal(text) => {
                        exprs.push(crate::expression_parser::Expr::str(text))
                    }
                    JoinPart::Value(inner) => {
                        inner.collect_symbols(&mut symbols);
                        let expr = inner.as_expr().cloned().ok_or_else(|| {
                            CompilerError::syntax(format!(
                                "Fallback expressions cannot be nested in `{}`",
                                source
                            ))
                        })?;
                        exprs.push(expr);
                    }
                }
            }
            ValueExpr::Value(
                Value::new(wrap(crate::expression_parser::Expr::Concat(exprs)), source)
                    .with_symbols(&symbols),
            )
        }
    })
}
