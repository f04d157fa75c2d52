//! Wrapper dialects: `not:`, `nocall:`, `exists:` and `provider:`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::path::{validate_path, PathTranslator};
use super::{map_value, ExpressionTranslator, TranslatorRegistry};
use crate::config::Symbols;
use crate::error::{CompilerError, Result};
use crate::expression_parser::Expr;
use crate::output::{Symbol, Value, ValueExpr};

static PROVIDER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_\-\.]*$").unwrap());

/// Boolean negation of an expression in the surrounding dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotTranslator;

impl ExpressionTranslator for NotTranslator {
    fn name(&self) -> &str {
        "not"
    }

    fn validate(&self, source: &str) -> Result<()> {
        if source.trim().is_empty() {
            return Err(CompilerError::syntax("Empty `not:` expression"));
        }
        Ok(())
    }

    fn translate(
        &self,
        source: &str,
        registry: &TranslatorRegistry,
        dialect: &str,
    ) -> Result<ValueExpr> {
        map_value(registry.compile(source, dialect)?, &Expr::not)
    }
}

/// A path whose final value is not called.
#[derive(Debug, Clone)]
pub struct NocallTranslator {
    path: PathTranslator,
}

impl NocallTranslator {
    pub fn new(symbols: Symbols) -> Self {
        NocallTranslator {
            path: PathTranslator::new(symbols),
        }
    }
}

impl ExpressionTranslator for NocallTranslator {
    fn name(&self) -> &str {
        "nocall"
    }

    fn validate(&self, source: &str) -> Result<()> {
        validate_path(source)
    }

    fn translate(&self, source: &str, _: &TranslatorRegistry, _: &str) -> Result<ValueExpr> {
        self.path.traversal(source, false)
    }
}

/// True when a path resolves without an evaluation error.
#[derive(Debug, Clone)]
pub struct ExistsTranslator {
    path: PathTranslator,
    symbols: Symbols,
}

impl ExistsTranslator {
    pub fn new(symbols: Symbols) -> Self {
        ExistsTranslator {
            path: PathTranslator::new(symbols.clone()),
            symbols,
        }
    }
}

impl ExpressionTranslator for ExistsTranslator {
    fn name(&self) -> &str {
        "exists"
    }

    fn validate(&self, source: &str) -> Result<()> {
        validate_path(source)
    }

    fn translate(&self, source: &str, _: &TranslatorRegistry, _: &str) -> Result<ValueExpr> {
        let exists = self.symbols.exists;
        let traversal = self.path.traversal(source, false)?;
        match map_value(traversal, &|expr| Expr::helper(exists, vec![expr]))? {
            ValueExpr::Value(value) => Ok(ValueExpr::Value(value.with_symbol(exists, Symbol::Exists))),
            other => Ok(other),
        }
    }
}

/// Render a named content provider as markup.
#[derive(Debug, Clone)]
pub struct ProviderTranslator {
    symbols: Symbols,
}

impl ProviderTranslator {
    pub fn new(symbols: Symbols) -> Self {
        ProviderTranslator { symbols }
    }
}

impl ExpressionTranslator for ProviderTranslator {
    fn name(&self) -> &str {
        "provider"
    }

    fn validate(&self, source: &str) -> Result<()> {
        if PROVIDER_NAME.is_match(source.trim()) {
            Ok(())
        } else {
            Err(CompilerError::syntax(format!(
                "`{}` is not a valid content provider name",
                source.trim()
            )))
        }
    }

    fn translate(&self, source: &str, _: &TranslatorRegistry, _: &str) -> Result<ValueExpr> {
        let name = source.trim();
        let call = Expr::helper(self.symbols.provider, vec![Expr::str(name)]);
        Ok(ValueExpr::Value(
            Value::new(call, format!("provider:{}", name))
                .with_symbol(self.symbols.provider, Symbol::ContentProvider),
        ))
    }
}
