//! Directive argument syntax: definitions, attribute lists, i18n mappings
//! and the Genshi-style `def`, `for` and `with` forms.
//!
//! Semicolons separate entries; `;;` stands for a literal semicolon. An
//! entry whose expression fails validation is extended to the next
//! separator, so a semicolon inside a string literal is left alone.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CompilerError, Result};

static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
static ATTRIBUTE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-\.]*(:[A-Za-z_][A-Za-z0-9_\-\.]*)?$").unwrap());
static SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*$").unwrap());
static FOR_LOOP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\(?\s*([A-Za-z_][A-Za-z0-9_\s,]*?)\s*\)?\s+in\s+(.+)$").unwrap());

/// One `[local|global] names expression` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub names: Vec<String>,
    pub global: bool,
    /// `None` when the entry has no expression.
    pub expression: Option<String>,
}

/// Validate a variable name a template may bind.
pub fn variable(name: &str) -> Result<String> {
    let name = name.trim();
    if !NAME.is_match(name) {
        return Err(CompilerError::syntax(format!(
            "Invalid variable name `{}`",
            name
        )));
    }
    if name == "repeat" {
        return Err(CompilerError::syntax(format!(
            "Invalid variable name `{}` (reserved)",
            name
        )));
    }
    if name.starts_with('_') {
        return Err(CompilerError::syntax(format!(
            "Invalid variable name `{}` (starts with an underscore)",
            name
        )));
    }
    Ok(name.to_string())
}

/// `a` or `(a, b)` or `a, b`.
fn variables(source: &str) -> Result<Vec<String>> {
    let inner = source
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')');
    inner
        .split(',')
        .filter(|name| !name.trim().is_empty())
        .map(variable)
        .collect()
}

/// Byte offsets of single `;` separators, skipping `;;` pairs.
fn separators(source: &str) -> Vec<usize> {
    let bytes = source.as_bytes();
    let mut result = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b';' {
            if bytes.get(i + 1) == Some(&b';') {
                i += 2;
                continue;
            }
            result.push(i);
        }
        i += 1;
    }
    result.push(source.len());
    result
}

/// Split `source` into entries, extending an entry whose `expression` part
/// fails `validate` across the next separator.
fn entries<F>(source: &str, validate: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    let separators = separators(source);
    let mut result = Vec::new();
    let mut start = 0;
    let mut k = 0;
    while k < separators.len() {
        let end = separators[k];
        let candidate = &source[start..end];
        let entry = candidate.replace(";;", ";");
        if !validate(&entry) && k + 1 < separators.len() {
            k += 1;
            continue;
        }
        if !entry.trim().is_empty() {
            result.push(entry.trim().to_string());
        }
        start = (end + 1).min(source.len());
        k += 1;
    }
    Ok(result)
}

/// Split an entry into its leading target and the remaining expression.
fn head(entry: &str) -> (&str, Option<&str>) {
    let entry = entry.trim();
    let split_at = if entry.starts_with('(') {
        entry.find(')').map(|i| i + 1)
    } else {
        entry.find(char::is_whitespace)
    };
    match split_at {
        Some(i) if i < entry.len() => {
            let rest = entry[i..].trim();
            (&entry[..i], if rest.is_empty() { None } else { Some(rest) })
        }
        _ => (entry, None),
    }
}

fn definition(entry: &str) -> Result<Definition> {
    let mut global = false;
    let mut entry = entry.trim();
    for (keyword, is_global) in [("global ", true), ("local ", false)] {
        if let Some(rest) = entry.strip_prefix(keyword) {
            global = is_global;
            entry = rest.trim_start();
            break;
        }
    }
    if entry.starts_with('(') && !entry.contains(')') {
        return Err(CompilerError::syntax(format!(
            "Invalid variable tuple definition `{}`",
            entry
        )));
    }
    let (target, expression) = head(entry);
    Ok(Definition {
        names: variables(target)?,
        global,
        expression: expression.map(str::to_string),
    })
}

/// Parse `tal:define` / `tal:repeat` arguments. `validate` checks a
/// candidate expression.
pub fn definitions<F>(source: &str, validate: F) -> Result<Vec<Definition>>
where
    F: Fn(&str) -> bool,
{
    let source = source.replace('\n', " ");
    let parsed = entries(&source, |entry| match definition(entry) {
        Ok(Definition {
            expression: Some(expression),
            ..
        }) => validate(&expression),
        Ok(_) => true,
        Err(_) => false,
    })?;
    parsed.iter().map(|entry| definition(entry)).collect()
}

/// Parse a single definition, as `tal:repeat` takes.
pub fn single_definition<F>(source: &str, validate: F) -> Result<Definition>
where
    F: Fn(&str) -> bool,
{
    let mut parsed = definitions(source, validate)?;
    if parsed.len() != 1 {
        return Err(CompilerError::syntax(format!(
            "Expected exactly one definition in `{}`",
            source
        )));
    }
    Ok(parsed.remove(0))
}

/// Parse `tal:attributes`: `name expression; name expression`.
pub fn attributes<F>(source: &str, validate: F) -> Result<Vec<(String, String)>>
where
    F: Fn(&str) -> bool,
{
    let source = source.replace('\n', " ");
    let parsed = entries(&source, |entry| match head(entry) {
        (_, Some(expression)) => validate(expression),
        _ => true,
    })?;
    parsed
        .iter()
        .map(|entry| match head(entry) {
            (name, Some(expression)) if ATTRIBUTE_NAME.is_match(name) => {
                Ok((name.to_string(), expression.to_string()))
            }
            _ => Err(CompilerError::syntax(format!(
                "Invalid attribute definition `{}`",
                entry
            ))),
        })
        .collect()
}

/// Parse an i18n mapping: `name [msgid]; name [msgid]`.
pub fn mapping(source: &str) -> Result<Vec<(String, Option<String>)>> {
    source
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split_whitespace().collect();
            match parts.as_slice() {
                [name] => Ok((name.to_string(), None)),
                [name, msgid] => Ok((name.to_string(), Some(msgid.to_string()))),
                _ => Err(CompilerError::syntax(format!(
                    "Invalid mapping `{}`",
                    source
                ))),
            }
        })
        .collect()
}

/// Parse `py:def="name(a, b)"`.
pub fn signature(source: &str) -> Result<(String, Vec<String>)> {
    let captures = SIGNATURE.captures(source).ok_or_else(|| {
        CompilerError::syntax(format!("Invalid function signature `{}`", source))
    })?;
    let name = variable(&captures[1])?;
    let args = variables(&captures[2])?;
    Ok((name, args))
}

/// Parse `py:for="x in expression"`.
pub fn for_loop(source: &str) -> Result<(Vec<String>, String)> {
    let source = source.replace('\n', " ");
    let captures = FOR_LOOP.captures(&source).ok_or_else(|| {
        CompilerError::syntax(format!("Invalid loop definition `{}`", source))
    })?;
    Ok((variables(&captures[1])?, captures[2].trim().to_string()))
}

/// Parse `py:with="a = 1; b = 2"`.
pub fn assignments<F>(source: &str, validate: F) -> Result<Vec<Definition>>
where
    F: Fn(&str) -> bool,
{
    let source = source.replace('\n', " ");
    let split = |entry: &str| -> Option<(String, String)> {
        let index = entry.find('=')?;
        let (target, expression) = (&entry[..index], &entry[index + 1..]);
        if expression.starts_with('=') {
            return None;
        }
        Some((target.trim().to_string(), expression.trim().to_string()))
    };
    let parsed = entries(&source, |entry| {
        split(entry).map_or(false, |(_, expression)| validate(&expression))
    })?;
    parsed
        .iter()
        .map(|entry| {
            let (target, expression) = split(entry).ok_or_else(|| {
                CompilerError::syntax(format!("Invalid assignment `{}`", entry))
            })?;
            Ok(Definition {
                names: variables(&target)?,
                global: false,
                expression: Some(expression),
            })
        })
        .collect()
}
