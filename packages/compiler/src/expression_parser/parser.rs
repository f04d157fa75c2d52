/**
 * Native Expression Parser
 *
 * Recursive-descent parser producing the shared expression AST
 */
use super::ast::*;
use super::lexer::{Lexer, Token};
use crate::chars;
use crate::error::{CompilerError, Result};

/// Native expression parser
#[derive(Debug, Default)]
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            lexer: Lexer::new(),
        }
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(&self, input: &str) -> Result<Expr> {
        let tokens = self.lexer.tokenize(input);
        if let Some(error) = tokens.iter().find(|token| token.is_error()) {
            return Err(CompilerError::syntax(error.str_value.clone()));
        }
        if tokens.is_empty() {
            return Err(CompilerError::syntax(format!(
                "Empty expression [{}]",
                input
            )));
        }
        let mut ast = ParseAST::new(input, tokens);
        let expr = ast.parse_expression_list()?;
        if let Some(token) = ast.current() {
            return Err(ast.error(&format!("Unexpected token '{}'", token.str_value)));
        }
        Ok(expr)
    }

    /// True when `input` is a well-formed native expression.
    pub fn is_valid(&self, input: &str) -> bool {
        self.parse(input).is_ok()
    }
}

struct ParseAST<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    index: usize,
}

impl<'a> ParseAST<'a> {
    fn new(input: &'a str, tokens: Vec<Token>) -> Self {
        ParseAST {
            input,
            tokens,
            index: 0,
        }
    }

    fn error(&self, message: &str) -> CompilerError {
        let location = match self.current() {
            Some(token) => format!("at column {}", token.index + 1),
            None => "at the end of the expression".to_string(),
        };
        CompilerError::syntax(format!(
            "Parser Error: {} {} in [{}]",
            message, location, self.input
        ))
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn consume_optional_character(&mut self, code: char) -> bool {
        if self.current().map_or(false, |t| t.is_character(code)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_optional_keyword(&mut self, keyword: &str) -> bool {
        if self.current().map_or(false, |t| t.is_keyword(keyword)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_optional_operator(&mut self, op: &str) -> bool {
        if self.current().map_or(false, |t| t.is_operator(op)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_character(&mut self, code: char) -> Result<()> {
        if self.consume_optional_character(code) {
            Ok(())
        } else {
            Err(self.error(&format!("Missing expected {}", code)))
        }
    }

    /// `a, b` at the top level or inside parentheses builds a tuple.
    fn parse_expression_list(&mut self) -> Result<Expr> {
        let first = self.parse_conditional()?;
        if !self.current().map_or(false, |t| t.is_character(chars::COMMA)) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.consume_optional_character(chars::COMMA) {
            if self.at_sequence_end() {
                break;
            }
            items.push(self.parse_conditional()?);
        }
        Ok(Expr::List(items))
    }

    fn at_sequence_end(&self) -> bool {
        match self.current() {
            None => true,
            Some(token) => {
                token.is_character(chars::RPAREN)
                    || token.is_character(chars::RBRACKET)
                    || token.is_character(chars::RBRACE)
            }
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let true_exp = self.parse_logical_or()?;
        if !self.consume_optional_keyword("if") {
            return Ok(true_exp);
        }
        let condition = self.parse_logical_or()?;
        if !self.consume_optional_keyword("else") {
            return Err(self.error("Conditional expression requires an else branch"));
        }
        let false_exp = self.parse_conditional()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            true_exp: Box::new(true_exp),
            false_exp: Box::new(false_exp),
        })
    }

    fn parse_logical_or(&mut self) -> Result<Expr> {
        let mut result = self.parse_logical_and()?;
        while self.consume_optional_keyword("or") {
            let right = self.parse_logical_and()?;
            result = Expr::binary(BinaryOperator::Or, result, right);
        }
        Ok(result)
    }

    fn parse_logical_and(&mut self) -> Result<Expr> {
        let mut result = self.parse_logical_not()?;
        while self.consume_optional_keyword("and") {
            let right = self.parse_logical_not()?;
            result = Expr::binary(BinaryOperator::And, result, right);
        }
        Ok(result)
    }

    fn parse_logical_not(&mut self) -> Result<Expr> {
        if self.consume_optional_keyword("not") {
            let expr = self.parse_logical_not()?;
            return Ok(Expr::not(expr));
        }
        self.parse_comparison()
    }

    fn comparison_operator(&mut self) -> Option<BinaryOperator> {
        let token = self.current()?;
        if let Some(op) = BinaryOperator::from_operator(&token.str_value) {
            if token.token_type == super::lexer::TokenType::Operator
                && matches!(
                    op,
                    BinaryOperator::Eq
                        | BinaryOperator::NotEq
                        | BinaryOperator::Lt
                        | BinaryOperator::LtE
                        | BinaryOperator::Gt
                        | BinaryOperator::GtE
                )
            {
                self.advance();
                return Some(op);
            }
            return None;
        }
        if token.is_keyword("in") {
            self.advance();
            return Some(BinaryOperator::In);
        }
        if token.is_keyword("not") && self.peek(1).map_or(false, |t| t.is_keyword("in")) {
            self.advance();
            self.advance();
            return Some(BinaryOperator::NotIn);
        }
        if token.is_keyword("is") {
            self.advance();
            if self.consume_optional_keyword("not") {
                return Some(BinaryOperator::IsNot);
            }
            return Some(BinaryOperator::Is);
        }
        None
    }

    /// Chained comparisons `a < b < c` become `a < b and b < c`.
    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        let mut result: Option<Expr> = None;
        while let Some(op) = self.comparison_operator() {
            let right = self.parse_additive()?;
            let comparison = Expr::binary(op, left, right.clone());
            result = Some(match result {
                Some(previous) => Expr::binary(BinaryOperator::And, previous, comparison),
                None => comparison,
            });
            left = right;
        }
        Ok(result.unwrap_or(left))
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut result = self.parse_multiplicative()?;
        loop {
            let op = if self.consume_optional_operator("+") {
                BinaryOperator::Add
            } else if self.consume_optional_operator("-") {
                BinaryOperator::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            result = Expr::binary(op, result, right);
        }
        Ok(result)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut result = self.parse_prefix()?;
        loop {
            let op = if self.consume_optional_operator("*") {
                BinaryOperator::Mul
            } else if self.consume_optional_operator("//") {
                BinaryOperator::FloorDiv
            } else if self.consume_optional_operator("/") {
                BinaryOperator::Div
            } else if self.consume_optional_operator("%") {
                BinaryOperator::Mod
            } else {
                break;
            };
            let right = self.parse_prefix()?;
            result = Expr::binary(op, result, right);
        }
        Ok(result)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        let operator = if self.consume_optional_operator("-") {
            UnaryOperator::Minus
        } else if self.consume_optional_operator("+") {
            UnaryOperator::Plus
        } else {
            return self.parse_call_chain();
        };
        let expr = self.parse_prefix()?;
        Ok(Expr::Unary {
            operator,
            expr: Box::new(expr),
        })
    }

    fn parse_call_chain(&mut self) -> Result<Expr> {
        let mut result = self.parse_primary()?;
        loop {
            if self.consume_optional_character(chars::PERIOD) {
                let name = match self.current() {
                    Some(token) if token.is_identifier() || token.token_type == super::lexer::TokenType::Keyword => {
                        token.str_value.clone()
                    }
                    _ => return Err(self.error("Expected identifier for property access")),
                };
                self.advance();
                result = Expr::Attribute {
                    receiver: Box::new(result),
                    name,
                };
            } else if self.consume_optional_character(chars::LBRACKET) {
                let key = self.parse_expression_list()?;
                self.expect_character(chars::RBRACKET)?;
                result = Expr::item(result, key);
            } else if self.consume_optional_character(chars::LPAREN) {
                let (args, kwargs) = self.parse_call_arguments()?;
                self.expect_character(chars::RPAREN)?;
                result = Expr::call(result, args, kwargs);
            } else {
                return Ok(result);
            }
        }
    }

    fn parse_call_arguments(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>)> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        while !self.current().map_or(true, |t| t.is_character(chars::RPAREN)) {
            let is_keyword_argument = self.current().map_or(false, |t| t.is_identifier())
                && self.peek(1).map_or(false, |t| t.is_operator("="));
            if is_keyword_argument {
                let name = self.current().map(|t| t.str_value.clone()).unwrap_or_default();
                self.advance();
                self.advance();
                kwargs.push((name, self.parse_conditional()?));
            } else if kwargs.is_empty() {
                args.push(self.parse_conditional()?);
            } else {
                return Err(self.error("Positional argument follows keyword argument"));
            }
            if !self.consume_optional_character(chars::COMMA) {
                break;
            }
        }
        Ok((args, kwargs))
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = match self.current() {
            Some(token) => token.clone(),
            None => return Err(self.error("Unexpected end of expression")),
        };

        if token.is_character(chars::LPAREN) {
            self.advance();
            if self.consume_optional_character(chars::RPAREN) {
                return Ok(Expr::List(Vec::new()));
            }
            let result = self.parse_expression_list()?;
            self.expect_character(chars::RPAREN)?;
            return Ok(result);
        }
        if token.is_character(chars::LBRACKET) {
            self.advance();
            return self.parse_literal_array();
        }
        if token.is_character(chars::LBRACE) {
            self.advance();
            return self.parse_literal_map();
        }
        if token.is_keyword("None") {
            self.advance();
            return Ok(Expr::none());
        }
        if token.is_keyword("True") || token.is_keyword("False") {
            self.advance();
            return Ok(Expr::bool(token.str_value == "True"));
        }
        if token.is_identifier() {
            self.advance();
            return Ok(Expr::Name(token.str_value));
        }
        if token.is_number() {
            self.advance();
            return parse_number(&token.str_value).ok_or_else(|| self.error("Invalid number"));
        }
        if token.is_string() {
            self.advance();
            // Adjacent string literals concatenate.
            let mut value = token.str_value;
            while let Some(next) = self.current().filter(|t| t.is_string()) {
                value.push_str(&next.str_value);
                self.advance();
            }
            return Ok(Expr::str(value));
        }
        Err(self.error(&format!("Unexpected token {}", token.str_value)))
    }

    fn parse_literal_array(&mut self) -> Result<Expr> {
        let mut items = Vec::new();
        while !self.consume_optional_character(chars::RBRACKET) {
            items.push(self.parse_conditional()?);
            if !self.consume_optional_character(chars::COMMA) {
                self.expect_character(chars::RBRACKET)?;
                break;
            }
        }
        Ok(Expr::List(items))
    }

    fn parse_literal_map(&mut self) -> Result<Expr> {
        let mut entries = Vec::new();
        while !self.consume_optional_character(chars::RBRACE) {
            let key = self.parse_conditional()?;
            self.expect_character(chars::COLON)?;
            let value = self.parse_conditional()?;
            entries.push((key, value));
            if !self.consume_optional_character(chars::COMMA) {
                self.expect_character(chars::RBRACE)?;
                break;
            }
        }
        Ok(Expr::Dict(entries))
    }
}

fn parse_number(text: &str) -> Option<Expr> {
    if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>().ok().map(|n| Expr::Literal(Literal::Float(n)))
    } else {
        text.parse::<i64>().ok().map(|n| Expr::Literal(Literal::Int(n)))
    }
}
