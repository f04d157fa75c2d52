/**
 * Parser Tests
 *
 * Native expressions parse into the shared expression AST; the serializer
 * shows the grouping the parser chose.
 */

#[cfg(test)]
mod tests {
    use pagetemplate_compiler::expression_parser::{serialize, BinaryOperator, Expr, Parser};

    fn parse(text: &str) -> Expr {
        Parser::new()
            .parse(text)
            .unwrap_or_else(|err| panic!("failed to parse `{}`: {}", text, err))
    }

    fn unparse(text: &str) -> String {
        serialize(&parse(text))
    }

    fn parse_error(text: &str) -> String {
        Parser::new()
            .parse(text)
            .expect_err("expected a parse error")
            .to_string()
    }

    #[test]
    fn should_respect_arithmetic_precedence() {
        assert_eq!(unparse("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(unparse("(1 + 2) * 3"), "((1 + 2) * 3)");
        assert_eq!(unparse("7 // 2 % 3"), "((7 // 2) % 3)");
    }

    #[test]
    fn should_parse_logical_operators() {
        assert_eq!(unparse("a or b and not c"), "(a or (b and not c))");
    }

    #[test]
    fn should_parse_membership_and_identity() {
        assert_eq!(unparse("a in b"), "(a in b)");
        assert_eq!(unparse("a not in b"), "(a not in b)");
        assert_eq!(unparse("a is not None"), "(a is not None)");
        match parse("a is b") {
            Expr::Binary { operator, .. } => assert_eq!(operator, BinaryOperator::Is),
            other => panic!("expected binary expression, got {:?}", other),
        }
    }

    #[test]
    fn should_chain_comparisons() {
        assert_eq!(unparse("1 < x <= 3"), "((1 < x) and (x <= 3))");
    }

    #[test]
    fn should_parse_conditional_expressions() {
        assert_eq!(unparse("'a' if flag else 'b'"), "('a' if flag else 'b')");
    }

    #[test]
    fn should_parse_calls_with_keyword_arguments() {
        assert_eq!(unparse("f(1, x, key='v')"), "f(1, x, key='v')");
        assert_eq!(unparse("user.name.upper()"), "user.name.upper()");
    }

    #[test]
    fn should_parse_subscripts_and_displays() {
        assert_eq!(unparse("items[0]"), "items[0]");
        assert_eq!(unparse("[1, 2]"), "[1, 2]");
        assert_eq!(unparse("{'a': 1}"), "{'a': 1}");
    }

    #[test]
    fn should_parse_tuples() {
        assert_eq!(unparse("a, b"), "[a, b]");
    }

    #[test]
    fn should_reject_trailing_tokens() {
        assert!(parse_error("a b").contains("Unexpected token 'b'"));
    }

    #[test]
    fn should_require_an_else_branch() {
        assert!(parse_error("a if b").contains("requires an else branch"));
    }

    #[test]
    fn should_reject_empty_expressions() {
        assert!(parse_error("   ").contains("Empty expression"));
    }

    #[test]
    fn should_validate() {
        let parser = Parser::new();
        assert!(parser.is_valid("len(items) > 0"));
        assert!(!parser.is_valid("len(items"));
    }
}
