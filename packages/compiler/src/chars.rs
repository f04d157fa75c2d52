//! Character constants used by the expression scanners.

// Special characters
pub const EOF: char = '\0';
pub const TAB: char = '\t';
pub const NEWLINE: char = '\n';
pub const RETURN: char = '\r';
pub const SPACE: char = ' ';

// Punctuation
pub const BANG: char = '!';
pub const DQ: char = '"';
pub const DOLLAR: char = '$';
pub const PERCENT: char = '%';
pub const SQ: char = '\'';
pub const LPAREN: char = '(';
pub const RPAREN: char = ')';
pub const STAR: char = '*';
pub const PLUS: char = '+';
pub const COMMA: char = ',';
pub const MINUS: char = '-';
pub const PERIOD: char = '.';
pub const SLASH: char = '/';
pub const COLON: char = ':';
pub const LT: char = '<';
pub const EQ: char = '=';
pub const GT: char = '>';

// Brackets
pub const LBRACKET: char = '[';
pub const BACKSLASH: char = '\\';
pub const RBRACKET: char = ']';
pub const UNDERSCORE: char = '_';

// Braces
pub const LBRACE: char = '{';
pub const RBRACE: char = '}';

/// Check if character is whitespace
pub fn is_whitespace(ch: char) -> bool {
    ch == SPACE || ch == TAB || ch == NEWLINE || ch == RETURN || ch <= ' '
}

/// Check if character is a digit
pub fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

/// Check if character can start an identifier
pub fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == UNDERSCORE
}

/// Check if character can be part of an identifier
pub fn is_identifier_part(ch: char) -> bool {
    is_identifier_start(ch) || is_digit(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_whitespace() {
        assert!(is_whitespace(' '));
        assert!(is_whitespace('\t'));
        assert!(is_whitespace('\n'));
        assert!(!is_whitespace('a'));
    }

    #[test]
    fn test_is_identifier_start() {
        assert!(is_identifier_start('a'));
        assert!(is_identifier_start('Z'));
        assert!(is_identifier_start('_'));
        assert!(!is_identifier_start('$'));
        assert!(!is_identifier_start('5'));
    }

    #[test]
    fn test_is_identifier_part() {
        assert!(is_identifier_part('5'));
        assert!(is_identifier_part('_'));
        assert!(!is_identifier_part('!'));
    }
}
