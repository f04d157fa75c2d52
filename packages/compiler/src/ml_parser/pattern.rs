//! Element Patterns
//!
//! The path subset `py:match` selects elements with. Steps are joined by
//! `/` or `//`. Each step tests `*`, a name or a prefixed name, followed by
//! any number of `[@name]` or `[@name='value']` predicates. A relative
//! pattern starts at the root element; an absolute one at the document.

use std::ptr;

use super::ast::Element;
use crate::error::{CompilerError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Name {
        prefix: Option<String>,
        local: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Predicate {
    attribute: String,
    value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    /// Reached through `//` rather than `/`.
    descendant: bool,
    test: NameTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    absolute: bool,
    steps: Vec<Step>,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self> {
        PatternParser {
            source,
            input: source.trim(),
        }
        .parse()
    }

    /// Elements under `root` matching the pattern, in document order.
    pub fn select<'e>(&self, root: &'e Element) -> Vec<&'e Element> {
        let mut current: Vec<&'e Element> = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            let mut candidates: Vec<&'e Element> = Vec::new();
            if index == 0 {
                match (self.absolute, step.descendant) {
                    (true, false) => candidates.push(root),
                    (true, true) => candidates.extend(root.descendants()),
                    (false, false) => candidates.extend(root.children.iter()),
                    (false, true) => candidates.extend(root.descendants().skip(1)),
                }
            } else {
                for context in &current {
                    if step.descendant {
                        candidates.extend(context.descendants().skip(1));
                    } else {
                        candidates.extend(context.children.iter());
                    }
                }
            }
            current = Vec::new();
            for candidate in candidates {
                if step.matches(candidate) && !current.iter().any(|seen| ptr::eq(*seen, candidate)) {
                    current.push(candidate);
                }
            }
        }
        let order: Vec<&'e Element> = root.descendants().collect();
        current.sort_by_key(|element| order.iter().position(|seen| ptr::eq(*seen, *element)));
        current
    }
}

impl Step {
    fn matches(&self, element: &Element) -> bool {
        if element.is_literal() {
            return false;
        }
        let name_matches = match &self.test {
            NameTest::Any => true,
            NameTest::Name { prefix, local } => {
                element.name.local == *local && element.name.prefix == *prefix
            }
        };
        name_matches
            && self.predicates.iter().all(|predicate| {
                let value = element
                    .attributes
                    .iter()
                    .find(|attribute| attribute.name.qualified() == predicate.attribute)
                    .map(|attribute| attribute.value.as_str());
                match (&predicate.value, value) {
                    (_, None) => false,
                    (None, Some(_)) => true,
                    (Some(expected), Some(actual)) => expected == actual,
                }
            })
    }
}

struct PatternParser<'s> {
    source: &'s str,
    input: &'s str,
}

impl<'s> PatternParser<'s> {
    fn error(&self, reason: &str) -> CompilerError {
        CompilerError::syntax(format!("Invalid match pattern `{}`: {}", self.source, reason))
    }

    fn parse(mut self) -> Result<Pattern> {
        if self.input.is_empty() {
            return Err(self.error("empty pattern"));
        }
        let absolute = self.input.starts_with('/');
        if let Some(rest) = self.input.strip_prefix("./") {
            self.input = rest;
        }
        let mut steps = Vec::new();
        let mut first = true;
        while !self.input.is_empty() || first {
            let descendant = if let Some(rest) = self.input.strip_prefix("//") {
                self.input = rest;
                true
            } else if let Some(rest) = self.input.strip_prefix('/') {
                self.input = rest;
                false
            } else if first {
                false
            } else {
                return Err(self.error("expected `/`"));
            };
            first = false;
            steps.push(self.step(descendant)?);
        }
        Ok(Pattern { absolute, steps })
    }

    fn step(&mut self, descendant: bool) -> Result<Step> {
        let end = self
            .input
            .find(|ch: char| ch == '/' || ch == '[')
            .unwrap_or(self.input.len());
        let name = self.input[..end].trim();
        self.input = &self.input[end..];
        let test = match name {
            "" => return Err(self.error("missing element name")),
            "*" => NameTest::Any,
            name => {
                let (prefix, local) = match name.split_once(':') {
                    Some((prefix, local)) => (Some(prefix.to_string()), local),
                    None => (None, name),
                };
                if !is_name(local) || prefix.as_deref().map_or(false, |prefix| !is_name(prefix)) {
                    return Err(self.error(&format!("bad element name `{}`", name)));
                }
                NameTest::Name {
                    prefix,
                    local: local.to_string(),
                }
            }
        };

        let mut predicates = Vec::new();
        while let Some(rest) = self.input.strip_prefix('[') {
            let close = rest
                .find(']')
                .ok_or_else(|| self.error("unterminated predicate"))?;
            predicates.push(self.predicate(&rest[..close])?);
            self.input = &rest[close + 1..];
        }
        Ok(Step {
            descendant,
            test,
            predicates,
        })
    }

    fn predicate(&self, source: &str) -> Result<Predicate> {
        let source = source.trim();
        let body = source
            .strip_prefix('@')
            .ok_or_else(|| self.error("only attribute predicates are supported"))?;
        let (attribute, value) = match body.split_once('=') {
            Some((attribute, value)) => {
                let value = value.trim();
                let unquoted = value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
                    .or_else(|| {
                        value
                            .strip_prefix('"')
                            .and_then(|value| value.strip_suffix('"'))
                    })
                    .ok_or_else(|| self.error("predicate value must be quoted"))?;
                (attribute.trim(), Some(unquoted.to_string()))
            }
            None => (body.trim(), None),
        };
        if attribute.is_empty() || !attribute.split(':').all(is_name) {
            return Err(self.error(&format!("bad attribute name `{}`", attribute)));
        }
        Ok(Predicate {
            attribute: attribute.to_string(),
            value,
        })
    }
}

fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .map_or(false, |ch| ch.is_alphabetic() || ch == '_')
        && chars.all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.'))
}
