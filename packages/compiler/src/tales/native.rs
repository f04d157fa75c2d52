//! Native expressions, parsed by the expression parser.

use super::{ExpressionTranslator, TranslatorRegistry};
use crate::error::Result;
use crate::expression_parser::Parser;
use crate::output::ValueExpr;

#[derive(Debug, Default)]
pub struct NativeTranslator {
    parser: Parser,
}

impl NativeTranslator {
    pub fn new() -> Self {
        NativeTranslator {
            parser: Parser::new(),
        }
    }
}

impl ExpressionTranslator for NativeTranslator {
    fn name(&self) -> &str {
        "native"
    }

    fn validate(&self, source: &str) -> Result<()> {
        self.parser.parse(source).map(|_| ())
    }

    fn translate(&self, source: &str, _: &TranslatorRegistry, _: &str) -> Result<ValueExpr> {
        let expr = self.parser.parse(source)?;
        Ok(ValueExpr::value(expr, source.trim()))
    }
}
