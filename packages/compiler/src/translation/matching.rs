//! Match Templates
//!
//! Resolves every `py:match` element against the source tree before
//! compilation. Each template becomes a hoisted function taking the matched
//! element's selection; each matched element is replaced by a call to it.

use std::ptr;

use crate::config::Symbols;
use crate::error::Result;
use crate::ml_parser::{Element, Pattern, PY_NS};

#[derive(Debug)]
pub struct MatchTemplate<'e> {
    pub element: &'e Element,
    /// Function the template body is compiled into.
    pub name: String,
    /// Matched elements and the selector name their snapshot is bound to.
    pub targets: Vec<(&'e Element, String)>,
}

/// The match templates under `root`, in document order. Elements inside a
/// template never match, and an element matched by several templates goes
/// to the first.
pub fn match_templates<'e>(root: &'e Element, symbols: &Symbols) -> Result<Vec<MatchTemplate<'e>>> {
    let templates: Vec<(&'e Element, &'e str)> = root
        .descendants()
        .filter_map(|element| {
            element
                .attribute(Some(PY_NS), "match")
                .map(|source| (element, source))
        })
        .collect();
    if templates.is_empty() {
        return Ok(Vec::new());
    }

    let excluded: Vec<&'e Element> = templates
        .iter()
        .flat_map(|(element, _)| element.descendants())
        .collect();
    let mut claimed: Vec<&'e Element> = Vec::new();
    let mut selectors = 0;
    let mut resolved = Vec::with_capacity(templates.len());
    for (index, (element, source)) in templates.into_iter().enumerate() {
        let pattern = Pattern::parse(source).map_err(|err| {
            err.in_context(Some("py:match"), &element.name.qualified(), Some(element.location))
        })?;
        let mut targets = Vec::new();
        for target in pattern.select(root) {
            if contains(&excluded, target) || contains(&claimed, target) {
                continue;
            }
            claimed.push(target);
            targets.push((target, symbols.selector(selectors)));
            selectors += 1;
        }
        log::trace!(
            "py:match `{}` selects {} element(s)",
            source.trim(),
            targets.len()
        );
        resolved.push(MatchTemplate {
            element,
            name: symbols.match_function(index),
            targets,
        });
    }
    Ok(resolved)
}

fn contains(elements: &[&Element], element: &Element) -> bool {
    elements.iter().any(|seen| ptr::eq(*seen, element))
}
