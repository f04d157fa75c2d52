/**
 * Native Expression Lexer
 *
 * Tokenizes native-dialect expressions into tokens for parsing
 */
use serde::{Deserialize, Serialize};

use crate::chars;

/// Token types in native expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TokenType {
    Character = 0,
    Identifier = 1,
    Keyword = 2,
    String = 3,
    Operator = 4,
    Number = 5,
    Error = 6,
}

/// Token representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub index: usize,
    pub end: usize,
    pub token_type: TokenType,
    pub str_value: String,
}

impl Token {
    pub fn new(index: usize, end: usize, token_type: TokenType, str_value: String) -> Self {
        Token {
            index,
            end,
            token_type,
            str_value,
        }
    }

    pub fn is_character(&self, code: char) -> bool {
        self.token_type == TokenType::Character && self.str_value.chars().next() == Some(code)
    }

    pub fn is_number(&self) -> bool {
        self.token_type == TokenType::Number
    }

    pub fn is_string(&self) -> bool {
        self.token_type == TokenType::String
    }

    pub fn is_identifier(&self) -> bool {
        self.token_type == TokenType::Identifier
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.token_type == TokenType::Keyword && self.str_value == keyword
    }

    pub fn is_operator(&self, operator: &str) -> bool {
        self.token_type == TokenType::Operator && self.str_value == operator
    }

    pub fn is_error(&self) -> bool {
        self.token_type == TokenType::Error
    }
}

const KEYWORDS: &[&str] = &[
    "True", "False", "None", "and", "or", "not", "in", "is", "if", "else",
];

/// Native expression lexer
#[derive(Debug, Default)]
pub struct Lexer;

impl Lexer {
    pub fn new() -> Self {
        Lexer
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        Scanner::new(text).scan()
    }
}

/// Scanner for tokenizing input
struct Scanner<'a> {
    input: &'a str,
    length: usize,
    index: usize,
    peek: char,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Scanner {
            input,
            length: input.len(),
            index: 0,
            peek: input.chars().next().unwrap_or(chars::EOF),
        }
    }

    fn scan(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.scan_token() {
            let is_error = token.is_error();
            tokens.push(token);
            if is_error {
                break;
            }
        }
        tokens
    }

    fn advance(&mut self) {
        if self.index >= self.length {
            return;
        }
        self.index += self.peek.len_utf8();
        self.peek = self.input[self.index..].chars().next().unwrap_or(chars::EOF);
    }

    fn peek_next(&self) -> char {
        let mut rest = self.input[self.index..].chars();
        rest.next();
        rest.next().unwrap_or(chars::EOF)
    }

    fn scan_token(&mut self) -> Option<Token> {
        while self.index < self.length && chars::is_whitespace(self.peek) {
            self.advance();
        }

        if self.index >= self.length {
            return None;
        }

        let start = self.index;
        let ch = self.peek;

        if chars::is_identifier_start(ch) {
            return Some(self.scan_identifier());
        }

        if chars::is_digit(ch) || (ch == chars::PERIOD && chars::is_digit(self.peek_next())) {
            return Some(self.scan_number(start));
        }

        match ch {
            chars::PERIOD
            | chars::LPAREN
            | chars::RPAREN
            | chars::LBRACKET
            | chars::RBRACKET
            | chars::LBRACE
            | chars::RBRACE
            | chars::COMMA
            | chars::COLON => {
                self.advance();
                Some(Token::new(start, self.index, TokenType::Character, ch.to_string()))
            }
            chars::SQ | chars::DQ => Some(self.scan_string(ch)),
            chars::PLUS | chars::MINUS | chars::STAR | chars::PERCENT => {
                self.advance();
                Some(Token::new(start, self.index, TokenType::Operator, ch.to_string()))
            }
            chars::SLASH => Some(self.scan_complex_operator(start, "/", chars::SLASH, "//")),
            chars::LT => Some(self.scan_complex_operator(start, "<", chars::EQ, "<=")),
            chars::GT => Some(self.scan_complex_operator(start, ">", chars::EQ, ">=")),
            chars::EQ => Some(self.scan_complex_operator(start, "=", chars::EQ, "==")),
            chars::BANG => {
                self.advance();
                if self.peek == chars::EQ {
                    self.advance();
                    Some(Token::new(start, self.index, TokenType::Operator, "!=".into()))
                } else {
                    Some(self.error(start, "Unexpected character [!]"))
                }
            }
            _ => {
                self.advance();
                Some(self.error(start, &format!("Unexpected character [{}]", ch)))
            }
        }
    }

    fn scan_complex_operator(&mut self, start: usize, one: &str, code: char, two: &str) -> Token {
        self.advance();
        let text = if self.peek == code {
            self.advance();
            two
        } else {
            one
        };
        Token::new(start, self.index, TokenType::Operator, text.to_string())
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.index;
        while chars::is_identifier_part(self.peek) {
            self.advance();
        }
        let text = &self.input[start..self.index];
        let token_type = if KEYWORDS.contains(&text) {
            TokenType::Keyword
        } else {
            TokenType::Identifier
        };
        Token::new(start, self.index, token_type, text.to_string())
    }

    fn scan_number(&mut self, start: usize) -> Token {
        while chars::is_digit(self.peek) {
            self.advance();
        }
        if self.peek == chars::PERIOD {
            self.advance();
            while chars::is_digit(self.peek) {
                self.advance();
            }
        }
        if self.peek == 'e' || self.peek == 'E' {
            self.advance();
            if self.peek == chars::PLUS || self.peek == chars::MINUS {
                self.advance();
            }
            if !chars::is_digit(self.peek) {
                return self.error(start, "Invalid exponent");
            }
            while chars::is_digit(self.peek) {
                self.advance();
            }
        }
        Token::new(
            start,
            self.index,
            TokenType::Number,
            self.input[start..self.index].to_string(),
        )
    }

    fn scan_string(&mut self, quote: char) -> Token {
        let start = self.index;
        self.advance();
        let mut buffer = String::new();
        loop {
            if self.index >= self.length {
                return self.error(start, "Unterminated quote");
            }
            let ch = self.peek;
            if ch == quote {
                self.advance();
                break;
            }
            if ch == chars::BACKSLASH {
                self.advance();
                let escaped = match self.peek {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    chars::EOF => return self.error(start, "Unterminated quote"),
                    other => other,
                };
                buffer.push(escaped);
                self.advance();
                continue;
            }
            buffer.push(ch);
            self.advance();
        }
        Token::new(start, self.index, TokenType::String, buffer)
    }

    fn error(&self, start: usize, message: &str) -> Token {
        Token::new(
            start,
            self.index,
            TokenType::Error,
            format!("Lexer Error: {} at column {} in expression [{}]", message, start, self.input),
        )
    }
}
