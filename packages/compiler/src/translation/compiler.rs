//! Template Compiler
//!
//! Entry point from a parsed document to a program, for the whole document
//! or for one macro defined in it.

use super::matching::match_templates;
use super::node::{metal_attribute, Context, Mode, NodeSerializer, VisitNode};
use crate::error::{CompilerError, Result};
use crate::ml_parser::{Document, Element, META_NS};
use crate::output::{CodeStream, Program, ProgramKind};
use crate::runtime::Selection;
use crate::tales::TranslatorRegistry;

/// Compile `document` into a program taking `parameters`. With a macro
/// name only that macro's element is compiled, without the doctype.
pub fn compile(
    document: &Document,
    macro_name: Option<&str>,
    parameters: &[String],
    registry: &TranslatorRegistry,
    dialect: &str,
) -> Result<Program> {
    let (kind, root) = match macro_name {
        Some(name) => (
            ProgramKind::Macro,
            find_macro(&document.root, name)
                .ok_or_else(|| CompilerError::MacroNotFound(name.to_string()))?,
        ),
        None => (ProgramKind::Template, &document.root),
    };
    let context = Context {
        dialect: registry.get(dialect)?.name(),
        interpolation: true,
        text: document.root.name.is(META_NS, "text"),
        choice: None,
    };

    let matches = match_templates(root, &registry.symbols)?;
    let selectors: Vec<(String, Selection)> = matches
        .iter()
        .flat_map(|template| &template.targets)
        .map(|(element, selector)| (selector.clone(), Selection::of(element)))
        .collect();

    let stream = CodeStream::new(registry.symbols.clone(), parameters);
    let mut serializer = NodeSerializer::new(stream, registry, kind).with_matches(matches);
    if kind == ProgramKind::Template {
        if let Some(doctype) = &document.doctype {
            serializer.stream_mut().out(&format!("{}\n", doctype));
        }
    }
    serializer.visit_node(VisitNode {
        element: root,
        context,
        mode: Mode::Root,
    })?;

    let mut program = serializer
        .into_stream()
        .finish(kind, parameters.to_vec())?;
    program.selectors = selectors;
    log::debug!(
        "compiled {:?}{} into {} lines",
        kind,
        macro_name.map(|name| format!(" `{}`", name)).unwrap_or_default(),
        program.listing.len()
    );
    log::trace!("{}", program.source());
    Ok(program)
}

/// The element defining macro `name`, the root included.
pub fn find_macro<'e>(root: &'e Element, name: &str) -> Option<&'e Element> {
    root.descendants()
        .find(|element| metal_attribute(element, "define-macro").map(str::trim) == Some(name))
}

/// Names of every macro defined in the document, in document order.
pub fn macro_names(document: &Document) -> Vec<String> {
    document
        .root
        .descendants()
        .filter_map(|element| metal_attribute(element, "define-macro"))
        .map(|name| name.trim().to_string())
        .collect()
}
