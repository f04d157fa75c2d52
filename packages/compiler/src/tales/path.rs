//! Path expressions: `base/segment/?variable/0`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ExpressionTranslator, TranslatorRegistry};
use crate::config::Symbols;
use crate::error::{CompilerError, Result};
use crate::expression_parser::Expr;
use crate::output::{Symbol, Value, ValueExpr};

static PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z_][A-Za-z0-9_]*(/(\?[A-Za-z_][A-Za-z0-9_]*|[A-Za-z0-9_@\-+~][A-Za-z0-9_@\-\.+~]*))*$",
    )
    .unwrap()
});

#[derive(Debug, Clone)]
pub struct PathTranslator {
    symbols: Symbols,
}

impl PathTranslator {
    pub fn new(symbols: Symbols) -> Self {
        PathTranslator { symbols }
    }

    /// The traversal call for `source`; `call` controls whether a callable
    /// result is invoked.
    pub fn traversal(&self, source: &str, call: bool) -> Result<ValueExpr> {
        let source = source.trim();
        validate_path(source)?;
        if source == "nothing" {
            return Ok(ValueExpr::value(Expr::none(), source));
        }
        let mut segments = source.split('/');
        let base = segments.next().unwrap_or_default();
        let mut args = vec![Expr::name(base), Expr::bool(call)];
        for segment in segments {
            args.push(match segment.strip_prefix('?') {
                Some(variable) => Expr::name(variable),
                None => Expr::str(segment),
            });
        }
        Ok(ValueExpr::Value(
            Value::new(Expr::helper(self.symbols.path, args), source)
                .with_symbol(self.symbols.path, Symbol::Traverse),
        ))
    }
}

pub fn validate_path(source: &str) -> Result<()> {
    if PATH.is_match(source.trim()) {
        Ok(())
    } else {
        Err(CompilerError::syntax(format!(
            "Not a valid path expression: `{}`",
            source
        )))
    }
}

impl ExpressionTranslator for PathTranslator {
    fn name(&self) -> &str {
        "path"
    }

    fn validate(&self, source: &str) -> Result<()> {
        validate_path(source)
    }

    fn translate(&self, source: &str, _: &TranslatorRegistry, _: &str) -> Result<ValueExpr> {
        self.traversal(source, true)
    }
}
