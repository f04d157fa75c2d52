//! HTML escaping for text and attribute output.

use std::borrow::Cow;

/// Escape `&`, `<` and `>`. Quotes are left alone in text context.
pub fn escape_text(input: &str) -> Cow<'_, str> {
    escape(input, false)
}

/// Escape `&`, `<`, `>` and `"` for a double-quoted attribute value.
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    escape(input, true)
}

fn escape(input: &str, quote: bool) -> Cow<'_, str> {
    let needs_escape = input
        .bytes()
        .any(|b| b == b'&' || b == b'<' || b == b'>' || (quote && b == b'"'));
    if !needs_escape {
        return Cow::Borrowed(input);
    }
    // Ampersands go first so the entities introduced below stay intact.
    let mut result = input.replace('&', "&amp;");
    result = result.replace('<', "&lt;").replace('>', "&gt;");
    if quote {
        result = result.replace('"', "&quot;");
    }
    Cow::Owned(result)
}
