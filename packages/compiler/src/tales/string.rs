//! String expressions: literal text with `${expr}` and `$name`
//! interpolation. `$$` and `\$` stand for a literal dollar sign.

use super::{ExpressionTranslator, TranslatorRegistry};
use crate::chars;
use crate::error::{CompilerError, Result};
use crate::output::{JoinPart, ValueExpr};

#[derive(Debug, Default, Clone, Copy)]
pub struct StringTranslator;

impl ExpressionTranslator for StringTranslator {
    fn name(&self) -> &str {
        "string"
    }

    fn validate(&self, source: &str) -> Result<()> {
        let mut rest = source;
        while let Some(start) = rest.find("${") {
            let tail = &rest[start + 2..];
            let end = tail.find('}').ok_or_else(|| {
                CompilerError::syntax(format!("Unterminated interpolation in `{}`", source))
            })?;
            rest = &tail[end + 1..];
        }
        Ok(())
    }

    fn translate(
        &self,
        source: &str,
        registry: &TranslatorRegistry,
        dialect: &str,
    ) -> Result<ValueExpr> {
        let parts = scan(source, registry, dialect, true)?;
        Ok(match parts.as_slice() {
            [] => ValueExpr::literal(""),
            [JoinPart::Literal(text)] => ValueExpr::literal(text.clone()),
            [JoinPart::Value(value)] => ValueExpr::Join(vec![JoinPart::Value(value.clone())]),
            _ => ValueExpr::Join(parts),
        })
    }

    fn consumes_remainder(&self) -> bool {
        true
    }
}

/// Split `text` into literal fragments and translated interpolations.
/// `bare_names` enables the `$name` form.
pub fn scan(
    text: &str,
    registry: &TranslatorRegistry,
    dialect: &str,
    bare_names: bool,
) -> Result<Vec<JoinPart>> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut index = 0;

    while index < text.len() {
        let rest = &text[index..];
        if rest.starts_with("\\$") || rest.starts_with("$$") {
            literal.push(chars::DOLLAR);
            index += 2;
            continue;
        }
        if let Some(body) = rest.strip_prefix("${") {
            let (value, consumed) = braced(body, registry, dialect)?;
            flush(&mut parts, &mut literal);
            parts.push(JoinPart::Value(value));
            index += 2 + consumed;
            continue;
        }
        if bare_names && rest.starts_with('$') {
            let name: String = rest[1..]
                .chars()
                .enumerate()
                .take_while(|(i, c)| {
                    if *i == 0 {
                        chars::is_identifier_start(*c)
                    } else {
                        chars::is_identifier_part(*c) || *c == chars::SLASH
                    }
                })
                .map(|(_, c)| c)
                .collect();
            let name = name.trim_end_matches(chars::SLASH);
            if !name.is_empty() {
                flush(&mut parts, &mut literal);
                parts.push(JoinPart::Value(registry.compile(name, "path")?));
                index += 1 + name.len();
                continue;
            }
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        literal.push(c);
        index += c.len_utf8();
    }
    flush(&mut parts, &mut literal);
    Ok(parts)
}

fn flush(parts: &mut Vec<JoinPart>, literal: &mut String) {
    if !literal.is_empty() {
        parts.push(JoinPart::Literal(std::mem::take(literal)));
    }
}

/// Translate the body of `${...}`, whose closing brace is the first one
/// after which the enclosed expression validates. Returns the value and the
/// number of bytes consumed including the brace.
fn braced(
    body: &str,
    registry: &TranslatorRegistry,
    dialect: &str,
) -> Result<(ValueExpr, usize)> {
    let mut last_error = None;
    for (end, _) in body.match_indices('}') {
        let expression = &body[..end];
        match registry.validate(expression, dialect) {
            Ok(()) => return Ok((registry.compile(expression, dialect)?, end + 1)),
            Err(err) => last_error = Some(err),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        CompilerError::syntax(format!("Unterminated interpolation `${{{}`", body))
    }))
}
