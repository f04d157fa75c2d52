//! Node Serializer
//!
//! Turns each element into its ordered clause list, then emits the clauses
//! around the element's children. Per element the order is fixed:
//!
//! 1. i18n domain
//! 2. variable definitions
//! 3. hoisted `py:def` children
//! 4. deferred tail text
//! 5. condition, including `py:when` and `py:otherwise`
//! 6. repeat
//! 7. tag open (dropped or wrapped in a condition by omit-tag)
//! 8. static leading text
//! 9. one of content, include, macro use or translation
//! 10. tag close

use indexmap::IndexMap;
use std::ptr;

use super::directives::{Directive, DirectiveTable};
use super::i18n::{create_msgid, translation_name};
use super::matching::MatchTemplate;
use crate::error::{CompilerError, Result};
use crate::expression_parser::{BinaryOperator, Expr};
use crate::ml_parser::{is_directive_namespace, Element, Text, METAL_NS};
use crate::output::clauses::{begin_all, end_all};
use crate::output::stream::Scope;
use crate::output::{
    Clause, ClauseEmitter, CodeStream, Declaration, JoinPart, ProgramKind, Symbol, Tag, Target,
    Value, ValueExpr,
};
use crate::runtime::escape::escape_text;
use crate::runtime::i18n::normalize_msgid;
use crate::tales::definitions::{
    assignments, attributes, definitions, for_loop, mapping, signature, single_definition,
};
use crate::tales::{interpolate, map_value, split_content_prefix, string, TranslatorRegistry};

/// Dialect used by the `py` directives.
const NATIVE: &str = "native";

/// How a visited element is being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// In document order, followed by its tail.
    Normal,
    /// The element compilation starts at.
    Root,
    /// Rendered into a capture buffer for a slot fill or an i18n name; the
    /// tail belongs to the enclosing markup.
    Captured,
    /// The body of a hoisted `py:def`.
    Definition,
}

/// Settings inherited from ancestors.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub dialect: &'a str,
    pub interpolation: bool,
    /// Plain-text template: nothing is escaped.
    pub text: bool,
    /// The innermost enclosing `py:choose`.
    pub choice: Option<Choice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub id: usize,
    /// Whether `py:choose` was given an expression to compare against.
    pub subject: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct VisitNode<'a> {
    pub element: &'a Element,
    pub context: Context<'a>,
    pub mode: Mode,
}

type Clauses<'a> = Vec<Clause<VisitNode<'a>>>;

enum Omit {
    Never,
    Always,
    When(ValueExpr),
}

pub struct NodeSerializer<'a> {
    stream: CodeStream,
    registry: &'a TranslatorRegistry,
    kind: ProgramKind,
    matches: Vec<MatchTemplate<'a>>,
    choices: usize,
}

impl<'a> ClauseEmitter for NodeSerializer<'a> {
    type Node = VisitNode<'a>;

    fn stream(&mut self) -> &mut CodeStream {
        &mut self.stream
    }

    fn visit(&mut self, node: &VisitNode<'a>) -> Result<()> {
        self.visit_node(*node)
    }
}

impl<'a> NodeSerializer<'a> {
    pub fn new(stream: CodeStream, registry: &'a TranslatorRegistry, kind: ProgramKind) -> Self {
        NodeSerializer {
            stream,
            registry,
            kind,
            matches: Vec::new(),
            choices: 0,
        }
    }

    pub fn with_matches(mut self, matches: Vec<MatchTemplate<'a>>) -> Self {
        self.matches = matches;
        self
    }

    fn match_template(&self, element: &Element) -> Option<&MatchTemplate<'a>> {
        self.matches
            .iter()
            .find(|template| ptr::eq(template.element, element))
    }

    /// The match function replacing `element` and its selector name.
    fn match_target(&self, element: &Element) -> Option<(String, String)> {
        self.matches.iter().find_map(|template| {
            template
                .targets
                .iter()
                .find(|(target, _)| ptr::eq(*target, element))
                .map(|(_, selector)| (template.name.clone(), selector.clone()))
        })
    }

    pub fn into_stream(self) -> CodeStream {
        self.stream
    }

    pub fn stream_mut(&mut self) -> &mut CodeStream {
        &mut self.stream
    }

    pub fn visit_node(&mut self, node: VisitNode<'a>) -> Result<()> {
        let element = node.element;
        let table = DirectiveTable::parse(element)?;

        // The body of a `py:def` or `py:match` was hoisted; only the tail
        // stays in place.
        if node.mode == Mode::Normal
            && (table.contains(Directive::Def) || table.contains(Directive::Match))
        {
            let mut clauses = Clauses::new();
            self.push_tail(&mut clauses, node)?;
            begin_all(&clauses, self)?;
            return end_all(&clauses, self);
        }

        let context = self.context(node, &table)?;
        let (clauses, skip) = self.serialize(node, &table, context)?;

        self.stream.scope.push(Scope::new());
        begin_all(&clauses, self)?;
        if !skip {
            for child in &element.children {
                self.visit_node(VisitNode {
                    element: child,
                    context,
                    mode: Mode::Normal,
                })?;
            }
        }
        end_all(&clauses, self)?;
        self.stream.scope.pop();
        Ok(())
    }

    fn context(&mut self, node: VisitNode<'a>, table: &DirectiveTable) -> Result<Context<'a>> {
        let mut context = node.context;
        if let Some(subject) = table.get(Directive::Choose) {
            context.choice = Some(Choice {
                id: self.choices,
                subject: !subject.trim().is_empty(),
            });
            self.choices += 1;
        }
        if let Some(dialect) = table.get(Directive::DefaultExpression) {
            let registry = self.registry;
            context.dialect = registry
                .get(dialect.trim())
                .map_err(|err| {
                    err.in_context(
                        table.attribute(Directive::DefaultExpression),
                        &node.element.name.qualified(),
                        Some(node.element.location),
                    )
                })?
                .name();
        }
        if let Some(flag) = table.get(Directive::Interpolation) {
            context.interpolation = !matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "false" | "off" | "no" | "0"
            );
        }
        Ok(context)
    }

    /// The clauses for one element and whether its children are replaced.
    fn serialize(
        &mut self,
        node: VisitNode<'a>,
        table: &DirectiveTable,
        context: Context<'a>,
    ) -> Result<(Clauses<'a>, bool)> {
        let element = node.element;
        let registry = self.registry;
        let symbols = registry.symbols.clone();
        let mut clauses = Clauses::new();

        if element.is_literal() {
            self.push_tail(&mut clauses, node)?;
            if let Some(text) = &element.text {
                clauses.push(Clause::out(text.value.clone()));
            }
            return Ok((clauses, true));
        }

        let element_name = element.name.qualified();
        let element_name = element_name.as_str();
        let at = |directive: Directive| {
            let attribute = table.attribute(directive).map(str::to_string);
            move |err: CompilerError| {
                err.in_context(attribute.as_deref(), element_name, Some(element.location))
            }
        };
        let compile = |directive: Directive, source: &str, dialect: &str| {
            registry.compile(source, dialect).map_err(at(directive))
        };
        let valid = |dialect: &'a str| move |source: &str| registry.validate(source, dialect).is_ok();

        // Names this element binds before its body, for macro calls.
        let mut bound: Vec<String> = Vec::new();

        if node.mode == Mode::Definition {
            match self.match_template(element) {
                Some(template) => clauses.push(Clause::Method {
                    name: template.name.clone(),
                    args: vec!["select".to_string()],
                }),
                None => {
                    let source = table.get(Directive::Def).unwrap_or_default();
                    let (name, args) = signature(source).map_err(at(Directive::Def))?;
                    clauses.push(Clause::Method { name, args });
                }
            }
        }

        // 1. i18n domain
        if let Some(domain) = table.get(Directive::Domain) {
            clauses.push(Clause::define(
                Declaration::new([symbols.domain]),
                ValueExpr::literal(domain.trim()),
            ));
        }

        // 2. definitions
        if let Some(source) = table.get(Directive::Define) {
            let parsed =
                definitions(source, valid(context.dialect)).map_err(at(Directive::Define))?;
            for definition in parsed {
                let expression = definition.expression.as_deref().ok_or_else(|| {
                    at(Directive::Define)(CompilerError::syntax(format!(
                        "Missing expression for `{}`",
                        definition.names.join(", ")
                    )))
                })?;
                let value = compile(Directive::Define, expression, context.dialect)?;
                let declaration = if definition.global {
                    Declaration::global(definition.names.iter().cloned())
                } else {
                    bound.extend(definition.names.iter().cloned());
                    Declaration::new(definition.names.iter().cloned())
                };
                clauses.push(Clause::define(declaration, value));
            }
        }
        if let Some(source) = table.get(Directive::With) {
            for assignment in assignments(source, valid(NATIVE)).map_err(at(Directive::With))? {
                let expression = assignment.expression.as_deref().unwrap_or_default();
                let value = compile(Directive::With, expression, NATIVE)?;
                bound.extend(assignment.names.iter().cloned());
                clauses.push(Clause::define(
                    Declaration::new(assignment.names.iter().cloned()),
                    value,
                ));
            }
        }

        if let (Some(source), Some(choice)) = (table.get(Directive::Choose), context.choice) {
            clauses.push(Clause::define(
                Declaration::new([symbols.choose_flag(choice.id)]),
                ValueExpr::value(Expr::bool(false), "False"),
            ));
            if choice.subject {
                let value = compile(Directive::Choose, source, NATIVE)?;
                clauses.push(Clause::define(
                    Declaration::new([symbols.choose_subject(choice.id)]),
                    value,
                ));
            }
        }

        // 3. hoisted definitions
        if node.mode == Mode::Root {
            for template in &self.matches {
                if !ptr::eq(template.element, element) {
                    clauses.push(Clause::Visit(VisitNode {
                        element: template.element,
                        context,
                        mode: Mode::Definition,
                    }));
                }
            }
        }
        for child in &element.children {
            if DirectiveTable::parse(child)?.contains(Directive::Def) {
                clauses.push(Clause::Visit(VisitNode {
                    element: child,
                    context,
                    mode: Mode::Definition,
                }));
            }
        }

        // 4. tail
        if node.mode == Mode::Normal {
            self.push_tail(&mut clauses, node)?;
        }

        // 5. condition
        if table.contains(Directive::When) || table.contains(Directive::Otherwise) {
            let directive = if table.contains(Directive::When) {
                Directive::When
            } else {
                Directive::Otherwise
            };
            let choice = node.context.choice.ok_or_else(|| {
                at(directive)(CompilerError::syntax(format!(
                    "`{}` outside of `py:choose`",
                    table.attribute(directive).unwrap_or_default()
                )))
            })?;
            let flag = symbols.choose_flag(choice.id);
            let unchosen = Expr::not(Expr::name(flag.clone()));
            match table.get(Directive::When) {
                Some(source) => {
                    let subject = choice.subject.then(|| symbols.choose_subject(choice.id));
                    let test = compile(Directive::When, source, NATIVE)?;
                    let guard = map_value(test, &|expr| {
                        let test = match &subject {
                            Some(subject) => {
                                Expr::binary(BinaryOperator::Eq, Expr::name(subject.clone()), expr)
                            }
                            None => expr,
                        };
                        Expr::binary(BinaryOperator::And, unchosen.clone(), test)
                    })
                    .map_err(at(Directive::When))?;
                    clauses.push(Clause::condition(guard));
                    clauses.push(Clause::Assign {
                        value: ValueExpr::value(Expr::bool(true), "True"),
                        target: Target::Var(flag),
                    });
                }
                None => {
                    let source = format!("not {}", flag);
                    clauses.push(Clause::condition(ValueExpr::value(unchosen, source)));
                }
            }
        }
        if let Some(source) = table.get(Directive::Condition) {
            let value = compile(Directive::Condition, source, context.dialect)?;
            clauses.push(Clause::condition(value));
        }
        if let Some(source) = table.get(Directive::If) {
            clauses.push(Clause::condition(compile(Directive::If, source, NATIVE)?));
        }

        // 6. repeat
        if let Some(source) = table.get(Directive::Repeat) {
            let definition =
                single_definition(source, valid(context.dialect)).map_err(at(Directive::Repeat))?;
            if definition.names.len() != 1 {
                return Err(at(Directive::Repeat)(CompilerError::syntax(
                    "Cannot unpack more than one variable in a repeat statement",
                )));
            }
            let expression = definition.expression.as_deref().ok_or_else(|| {
                at(Directive::Repeat)(CompilerError::syntax("Missing repeat expression"))
            })?;
            let value = compile(Directive::Repeat, expression, context.dialect)?;
            bound.extend(definition.names.iter().cloned());
            clauses.push(Clause::Repeat {
                declaration: Declaration::new(definition.names),
                value,
                repeatdict: true,
            });
        }
        if let Some(source) = table.get(Directive::For) {
            let (names, expression) = for_loop(source).map_err(at(Directive::For))?;
            let value = compile(Directive::For, &expression, NATIVE)?;
            bound.extend(names.iter().cloned());
            clauses.push(Clause::Repeat {
                declaration: Declaration::new(names),
                value,
                repeatdict: false,
            });
        }

        // content and replace
        let content_value = |directive: Directive, source: &str, dialect: &str| {
            let (structure, expression) = split_content_prefix(source);
            let value = compile(directive, expression, dialect)?;
            Ok::<_, CompilerError>(if structure || context.text {
                value
            } else {
                value.escape()
            })
        };
        let mut replace = false;
        let mut content = None;
        for (directive, dialect, replaces) in [
            (Directive::Content, context.dialect, false),
            (Directive::Replace, context.dialect, true),
            (Directive::PyContent, NATIVE, false),
            (Directive::PyReplace, NATIVE, true),
        ] {
            if let Some(source) = table.get(directive) {
                content = Some(content_value(directive, source, dialect)?);
                replace = replaces;
            }
        }

        // A `py:match` target is replaced by the template's output.
        if let Some((function, selector)) = self.match_target(element) {
            if content.is_some() {
                return Err(at(Directive::Match)(CompilerError::syntax(format!(
                    "`{}` is replaced by a match template and cannot set its own content",
                    element_name
                ))));
            }
            let call = Expr::call(
                Expr::name(function.clone()),
                vec![Expr::name(selector.clone())],
                Vec::new(),
            );
            content = Some(ValueExpr::value(call, format!("{}({})", function, selector)));
            replace = true;
        }

        // A filled slot is replaced by the fill.
        let mut filled_slot = false;
        if let Some(slot) = table.get(Directive::DefineSlot) {
            let variable = symbols.slot_variable(slot.trim());
            if self.stream.is_bound(&variable) {
                content = Some(ValueExpr::name(&variable));
                filled_slot = true;
            }
        }

        let translate = table.get(Directive::Translate);
        let use_macro = table.get(Directive::UseMacro);
        let dynamic = content.is_some() || translate.is_some();

        // 7. tag
        let omit = if !element.is_markup() || replace || filled_slot || use_macro.is_some() {
            Omit::Always
        } else if let Some((directive, source, dialect)) = table
            .get(Directive::OmitTag)
            .map(|source| (Directive::OmitTag, source, context.dialect))
            .or_else(|| {
                table
                    .get(Directive::Strip)
                    .map(|source| (Directive::Strip, source, NATIVE))
            })
        {
            if source.trim().is_empty() {
                Omit::Always
            } else {
                Omit::When(compile(directive, source, dialect)?)
            }
        } else {
            Omit::Never
        };

        if !matches!(omit, Omit::Always) {
            let tag = self.tag(node, table, context, dynamic)?;
            match omit {
                Omit::When(value) => clauses.push(Clause::Condition {
                    value: map_value(value, &Expr::not).map_err(at(Directive::OmitTag))?,
                    clauses: vec![Clause::Tag(tag)],
                    finalize: false,
                }),
                _ => clauses.push(Clause::Tag(tag)),
            }
        }

        // 8. static text
        let body_replaced = dynamic || use_macro.is_some() || table.include.is_some();
        if !body_replaced {
            if let Some(text) = element.text.as_ref().filter(|text| !text.is_empty()) {
                clauses.extend(self.text_clauses(text, context, element)?);
            }
        }

        // 9. content, include, macro or translation
        if let Some(content) = content {
            match translate {
                Some(msgid) if !msgid.trim().is_empty() => {
                    return Err(at(Directive::Translate)(CompilerError::syntax(
                        "Can't use message id with dynamic content translation",
                    )));
                }
                Some(_) => {
                    let escaped = content.is_escaped();
                    clauses.push(Clause::Assign {
                        value: content,
                        target: Target::Var(symbols.tmp.to_string()),
                    });
                    let translated = self.translation(ValueExpr::name(symbols.tmp), None, None)?;
                    clauses.push(Clause::Write(if escaped {
                        translated.escape()
                    } else {
                        translated
                    }));
                }
                None => clauses.push(Clause::Write(content)),
            }
        } else if let Some((href, parse)) = &table.include {
            let href = match interpolate(href, registry, context.dialect)? {
                Some(value) => value,
                None => ValueExpr::literal(href.clone()),
            };
            let include = symbols.include;
            let parse = parse.clone();
            let call = map_value(href, &|expr| {
                Expr::helper(include, vec![expr, Expr::str(parse.clone())])
            })?;
            clauses.push(Clause::Write(mark(call, include, Symbol::Include).escape()));
        } else if let Some(source) = use_macro {
            self.use_macro(&mut clauses, node, context, &bound, source)
                .map_err(at(Directive::UseMacro))?;
        } else if let Some(msgid) = translate {
            self.translate_block(&mut clauses, node, context, msgid)?;
        }

        let skip = body_replaced;
        Ok((clauses, skip))
    }

    /// Queue the element's tail to be written after it closes.
    fn push_tail(&self, clauses: &mut Clauses<'a>, node: VisitNode<'a>) -> Result<()> {
        let Some(tail) = node.element.tail.as_ref().filter(|tail| !tail.is_empty()) else {
            return Ok(());
        };
        let parts = self.text_clauses(tail, node.context, node.element)?;
        let literal = match parts.as_slice() {
            [Clause::Out { text, .. }] => Some(text.clone()),
            _ => None,
        };
        match literal {
            Some(text) => clauses.push(Clause::deferred(text)),
            None if parts.is_empty() => {}
            None => clauses.push(Clause::Group {
                clauses: parts,
                defer: true,
            }),
        }
        Ok(())
    }

    /// Literal text, split around `${...}` interpolations when enabled.
    fn text_clauses(
        &self,
        text: &Text,
        context: Context<'a>,
        element: &Element,
    ) -> Result<Clauses<'a>> {
        let literal = |value: &str| {
            if context.text {
                value.to_string()
            } else {
                escape_text(value).into_owned()
            }
        };
        if text.verbatim {
            return Ok(vec![Clause::out(text.value.clone())]);
        }
        if !context.interpolation || !text.value.contains("${") {
            return Ok(vec![Clause::out(literal(&text.value))]);
        }
        let parts = string::scan(&text.value, self.registry, context.dialect, false).map_err(
            |err| err.in_context(None, &element.name.qualified(), Some(element.location)),
        )?;
        Ok(parts
            .into_iter()
            .map(|part| match part {
                JoinPart::Literal(value) => Clause::out(literal(&value)),
                JoinPart::Value(value) if context.text => Clause::Write(value),
                JoinPart::Value(value) => Clause::Write(value.escape()),
            })
            .collect())
    }

    fn tag(
        &self,
        node: VisitNode<'a>,
        table: &DirectiveTable,
        context: Context<'a>,
        dynamic: bool,
    ) -> Result<Tag> {
        let element = node.element;
        let registry = self.registry;
        let element_name = element.name.qualified();
        let at = |directive: Directive| {
            let attribute = table.attribute(directive).map(str::to_string);
            let element_name = element_name.clone();
            move |err: CompilerError| {
                err.in_context(attribute.as_deref(), &element_name, Some(element.location))
            }
        };

        let mut statics: IndexMap<String, String> = table.statics.iter().cloned().collect();
        for (prefix, uri) in &element.namespaces {
            if is_directive_namespace(uri) {
                continue;
            }
            match prefix {
                None if node.mode == Mode::Root && self.kind == ProgramKind::Macro => {}
                None => {
                    statics.insert("xmlns".to_string(), uri.clone());
                }
                Some(prefix) => {
                    statics.insert(format!("xmlns:{}", prefix), uri.clone());
                }
            }
        }

        let mut dynamic_attributes: IndexMap<String, ValueExpr> = IndexMap::new();
        if context.interpolation {
            let interpolated: Vec<String> = statics
                .iter()
                .filter(|(_, value)| value.contains("${"))
                .map(|(name, _)| name.clone())
                .collect();
            for name in interpolated {
                let value = statics.get(&name).cloned().unwrap_or_default();
                let value = interpolate(&value, registry, context.dialect).map_err(|err| {
                    err.in_context(Some(&name), &element_name, Some(element.location))
                })?;
                if let Some(value) = value {
                    statics.shift_remove(&name);
                    dynamic_attributes.insert(name, value);
                }
            }
        }

        if let Some(source) = table.get(Directive::Attributes) {
            let validate = |source: &str| registry.validate(source, context.dialect).is_ok();
            for (name, expression) in
                attributes(source, validate).map_err(at(Directive::Attributes))?
            {
                let value = registry
                    .compile(&expression, context.dialect)
                    .map_err(at(Directive::Attributes))?;
                statics.shift_remove(&name);
                dynamic_attributes.insert(name, value);
            }
        }

        if let Some(source) = table.get(Directive::TranslateAttributes) {
            for (name, msgid) in mapping(source).map_err(at(Directive::TranslateAttributes))? {
                let translated = match msgid {
                    Some(msgid) => {
                        if dynamic_attributes.contains_key(&name) {
                            return Err(at(Directive::TranslateAttributes)(
                                CompilerError::syntax(
                                    "Message id not allowed in conjunction with a dynamic attribute",
                                ),
                            ));
                        }
                        let default = statics.shift_remove(&name).map(Expr::str);
                        self.translation(ValueExpr::literal(msgid), None, default)?
                    }
                    None => match dynamic_attributes.shift_remove(&name) {
                        Some(value) => self.translation(value, None, None)?,
                        None => match statics.shift_remove(&name) {
                            Some(value) => self.translation(
                                ValueExpr::literal(normalize_msgid(&value)),
                                None,
                                None,
                            )?,
                            None => {
                                return Err(at(Directive::TranslateAttributes)(
                                    CompilerError::syntax(format!(
                                        "Attribute `{}` must be either static or dynamic when no message id is supplied",
                                        name
                                    )),
                                ))
                            }
                        },
                    },
                };
                dynamic_attributes.insert(name, translated);
            }
        }

        let attribute_map = match table.get(Directive::AttributeMap) {
            Some(source) => Some(
                registry
                    .compile(source, NATIVE)
                    .map_err(at(Directive::AttributeMap))?,
            ),
            None => None,
        };

        let selfclosing = element.text.is_none() && !dynamic && element.children.is_empty();
        Ok(Tag {
            name: element_name.clone(),
            attributes: statics.into_iter().collect(),
            dynamic: dynamic_attributes.into_iter().collect(),
            attribute_map,
            selfclosing,
        })
    }

    /// Wrap `msgid` in a call to the translation helper.
    fn translation(
        &self,
        msgid: ValueExpr,
        mapping: Option<Expr>,
        default: Option<Expr>,
    ) -> Result<ValueExpr> {
        let symbols = &self.registry.symbols;
        let call = map_value(msgid, &|expr| {
            Expr::helper(
                symbols.translate,
                vec![
                    expr,
                    Expr::name(symbols.domain),
                    mapping.clone().unwrap_or_else(Expr::none),
                    Expr::name(symbols.language),
                    default.clone().unwrap_or_else(Expr::none),
                ],
            )
        })?;
        Ok(mark(call, symbols.translate, Symbol::Translate))
    }

    /// Render fill-slot descendants into capture buffers, then call the
    /// macro with the visible names and the filled slots.
    fn use_macro(
        &mut self,
        clauses: &mut Clauses<'a>,
        node: VisitNode<'a>,
        context: Context<'a>,
        bound: &[String],
        source: &str,
    ) -> Result<()> {
        let symbols = self.registry.symbols.clone();
        let mut fills = Vec::new();
        collect_fill_slots(node.element, &mut fills);

        let mut kwargs: IndexMap<String, Expr> = IndexMap::new();
        for name in self.stream.visible_names().into_iter().chain(bound.iter().cloned()) {
            kwargs.insert(name.clone(), Expr::name(name));
        }
        kwargs.insert(symbols.language.to_string(), Expr::name(symbols.language));

        for (slot, element) in fills {
            let variable = symbols.slot_variable(slot);
            clauses.push(Clause::Capture {
                target: Target::Var(variable.clone()),
                clauses: vec![Clause::Visit(VisitNode {
                    element,
                    context,
                    mode: Mode::Captured,
                })],
            });
            kwargs.insert(variable.clone(), Expr::name(variable));
        }

        let value = self.registry.compile(source, context.dialect)?;
        clauses.push(Clause::Assign {
            value,
            target: Target::Var(symbols.metal.to_string()),
        });
        let call = Expr::call(
            Expr::name(symbols.metal),
            Vec::new(),
            kwargs.into_iter().collect(),
        );
        clauses.push(Clause::Write(ValueExpr::value(
            call,
            format!("use-macro {}", source.trim()),
        )));
        Ok(())
    }

    /// Translate the element's content. Named children are rendered first
    /// so the translation can interpolate them; on a catalog miss the
    /// original content is written with the rendered children in place.
    fn translate_block(
        &mut self,
        clauses: &mut Clauses<'a>,
        node: VisitNode<'a>,
        context: Context<'a>,
        msgid: &str,
    ) -> Result<()> {
        let element = node.element;
        let symbols = self.registry.symbols.clone();
        let msgid = if msgid.trim().is_empty() {
            create_msgid(element)
        } else {
            msgid.trim().to_string()
        };

        let named: Vec<(&'a str, &'a Element)> = element
            .children
            .iter()
            .filter_map(|child| translation_name(child).map(|name| (name, child)))
            .collect();

        let mapping = if named.is_empty() {
            None
        } else {
            clauses.push(Clause::Assign {
                value: ValueExpr::value(Expr::Dict(Vec::new()), "{}"),
                target: Target::Var(symbols.mapping.to_string()),
            });
            for (name, child) in &named {
                clauses.push(Clause::Capture {
                    target: Target::Item {
                        var: symbols.mapping.to_string(),
                        key: name.to_string(),
                    },
                    clauses: vec![Clause::Visit(VisitNode {
                        element: child,
                        context,
                        mode: Mode::Captured,
                    })],
                });
            }
            Some(Expr::name(symbols.mapping))
        };

        clauses.push(Clause::Translate {
            msgid: ValueExpr::literal(msgid),
            mapping: mapping.clone(),
            default: Some(Expr::Symbol(symbols.marker.to_string())),
            target: Target::Var(symbols.result.to_string()),
        });

        let found = ValueExpr::Value(
            Value::new(
                Expr::binary(
                    BinaryOperator::IsNot,
                    Expr::name(symbols.result),
                    Expr::Symbol(symbols.marker.to_string()),
                ),
                format!("{} is not {}", symbols.result, symbols.marker),
            )
            .with_symbol(symbols.marker, Symbol::Marker),
        );
        clauses.push(Clause::Condition {
            value: found,
            clauses: vec![Clause::UnicodeWrite(ValueExpr::name(symbols.result))],
            finalize: true,
        });

        let literal = |value: &str| {
            if context.text {
                value.to_string()
            } else {
                escape_text(value).into_owned()
            }
        };
        let mut fallback = Clauses::new();
        if let Some(text) = element.text.as_ref().filter(|text| !text.is_empty()) {
            fallback.push(Clause::out(literal(&text.value)));
        }
        for child in &element.children {
            match translation_name(child) {
                Some(name) => fallback.push(Clause::Write(ValueExpr::value(
                    Expr::item(Expr::name(symbols.mapping), Expr::str(name)),
                    format!("{}['{}']", symbols.mapping, name),
                ))),
                None => fallback.push(Clause::out(crate::ml_parser::to_markup(child))),
            }
            if let Some(tail) = child.tail.as_ref().filter(|tail| !tail.is_empty()) {
                fallback.push(Clause::out(literal(&tail.value)));
            }
        }
        if !fallback.is_empty() {
            clauses.push(Clause::Else { clauses: fallback });
        }
        Ok(())
    }
}

/// Record `symbol` as a helper of every alternative in `value`.
fn mark(value: ValueExpr, name: &str, symbol: Symbol) -> ValueExpr {
    match value {
        ValueExpr::Value(value) => ValueExpr::Value(value.with_symbol(name, symbol)),
        ValueExpr::Parts(parts) => ValueExpr::Parts(
            parts
                .into_iter()
                .map(|part| mark(part, name, symbol))
                .collect(),
        ),
        ValueExpr::Escape(inner) => ValueExpr::Escape(Box::new(mark(*inner, name, symbol))),
        join @ ValueExpr::Join(_) => join,
    }
}

/// A `metal` directive, written prefixed or on a `metal:` element.
pub fn metal_attribute<'e>(element: &'e Element, local: &str) -> Option<&'e str> {
    element.attribute(Some(METAL_NS), local).or_else(|| {
        if element.name.in_namespace(METAL_NS) {
            element.attribute(None, local)
        } else {
            None
        }
    })
}

/// Fill-slot elements under a macro use, not crossing nested macro uses.
fn collect_fill_slots<'e>(element: &'e Element, found: &mut Vec<(&'e str, &'e Element)>) {
    for child in &element.children {
        if let Some(slot) = metal_attribute(child, "fill-slot") {
            found.push((slot.trim(), child));
        } else if metal_attribute(child, "use-macro").is_none() {
            collect_fill_slots(child, found);
        }
    }
}
