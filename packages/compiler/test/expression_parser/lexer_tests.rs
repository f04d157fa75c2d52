/**
 * Lexer Tests
 *
 * Tokenization of native-dialect expressions
 */

#[cfg(test)]
mod tests {
    use pagetemplate_compiler::expression_parser::lexer::{Lexer, Token, TokenType};

    fn lex(text: &str) -> Vec<Token> {
        Lexer::new().tokenize(text)
    }

    fn expect_token(token: &Token, index: usize, end: usize) {
        assert_eq!(token.index, index, "Token index mismatch");
        assert_eq!(token.end, end, "Token end mismatch");
    }

    #[test]
    fn should_tokenize_a_simple_identifier() {
        let tokens = lex("j");
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_identifier());
        expect_token(&tokens[0], 0, 1);
    }

    #[test]
    fn should_tokenize_attribute_access() {
        let tokens = lex("user.name");
        assert_eq!(tokens.len(), 3);
        assert!(tokens[0].is_identifier());
        assert!(tokens[1].is_character('.'));
        assert!(tokens[2].is_identifier());
        expect_token(&tokens[2], 5, 9);
    }

    #[test]
    fn should_tokenize_keywords() {
        let tokens = lex("a is not None and True");
        assert!(tokens[1].is_keyword("is"));
        assert!(tokens[2].is_keyword("not"));
        assert!(tokens[3].is_keyword("None"));
        assert!(tokens[4].is_keyword("and"));
        assert!(tokens[5].is_keyword("True"));
    }

    #[test]
    fn should_tokenize_numbers() {
        let tokens = lex("12 3.5 .25 1e3");
        assert!(tokens.iter().all(Token::is_number));
        let values: Vec<&str> = tokens.iter().map(|t| t.str_value.as_str()).collect();
        assert_eq!(values, vec!["12", "3.5", ".25", "1e3"]);
    }

    #[test]
    fn should_tokenize_quoted_strings_with_escapes() {
        let tokens = lex(r#"'a\'b' "c\nd""#);
        assert_eq!(tokens.len(), 2);
        assert!(tokens[0].is_string());
        assert_eq!(tokens[0].str_value, "a'b");
        assert_eq!(tokens[1].str_value, "c\nd");
    }

    #[test]
    fn should_tokenize_two_character_operators() {
        let tokens = lex("a // b <= c == d != e");
        let operators: Vec<&str> = tokens
            .iter()
            .filter(|t| t.token_type == TokenType::Operator)
            .map(|t| t.str_value.as_str())
            .collect();
        assert_eq!(operators, vec!["//", "<=", "==", "!="]);
    }

    #[test]
    fn should_report_unterminated_quote() {
        let tokens = lex("'abc");
        assert!(tokens[0].is_error());
        assert!(tokens[0].str_value.contains("Unterminated quote"));
    }

    #[test]
    fn should_report_unexpected_character() {
        let tokens = lex("a # b");
        assert!(tokens.iter().any(|t| t.is_error()
            && t.str_value.contains("Unexpected character [#]")));
    }
}
