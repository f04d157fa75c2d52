//! Clauses
//!
//! Two-phase code emitters. The node serializer turns each element into an
//! ordered list of clauses, calls `begin` on each in order, emits the
//! element's children, then calls `end` in reverse order. Every clause
//! balances in `end` whatever `begin` opened: indentation, temporaries and
//! scope entries.

use std::fmt;

use super::program::{Line, Target};
use super::stream::{CodeStream, Scope};
use super::value_expr::{Declaration, JoinPart, Symbol, Value, ValueExpr};
use crate::error::Result;
use crate::expression_parser::Expr;
use crate::runtime::escape::escape_attribute;

/// What clauses write into. `visit` compiles a nested node in place.
pub trait ClauseEmitter {
    type Node: fmt::Debug;

    fn stream(&mut self) -> &mut CodeStream;

    fn visit(&mut self, node: &Self::Node) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub dynamic: Vec<(String, ValueExpr)>,
    /// Mapping of attributes merged over the static ones at runtime.
    pub attribute_map: Option<ValueExpr>,
    pub selfclosing: bool,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Tag {
            name: name.into(),
            attributes: Vec::new(),
            dynamic: Vec::new(),
            attribute_map: None,
            selfclosing: false,
        }
    }
}

#[derive(Debug)]
pub enum Clause<N> {
    Assign {
        value: ValueExpr,
        target: Target,
    },
    Define {
        declaration: Declaration,
        value: Option<ValueExpr>,
    },
    Condition {
        value: ValueExpr,
        clauses: Vec<Clause<N>>,
        finalize: bool,
    },
    Else {
        clauses: Vec<Clause<N>>,
    },
    Group {
        clauses: Vec<Clause<N>>,
        defer: bool,
    },
    Visit(N),
    Tag(Tag),
    Repeat {
        declaration: Declaration,
        value: ValueExpr,
        repeatdict: bool,
    },
    Write(ValueExpr),
    UnicodeWrite(ValueExpr),
    Out {
        text: String,
        defer: bool,
    },
    Method {
        name: String,
        args: Vec<String>,
    },
    Translate {
        msgid: ValueExpr,
        mapping: Option<Expr>,
        default: Option<Expr>,
        target: Target,
    },
    /// Render the nested clauses into a fresh buffer bound to `target`.
    Capture {
        target: Target,
        clauses: Vec<Clause<N>>,
    },
}

impl<N: fmt::Debug> Clause<N> {
    pub fn out(text: impl Into<String>) -> Self {
        Clause::Out {
            text: text.into(),
            defer: false,
        }
    }

    pub fn deferred(text: impl Into<String>) -> Self {
        Clause::Out {
            text: text.into(),
            defer: true,
        }
    }

    pub fn group(clauses: Vec<Clause<N>>) -> Self {
        Clause::Group {
            clauses,
            defer: false,
        }
    }

    pub fn condition(value: ValueExpr) -> Self {
        Clause::Condition {
            value,
            clauses: Vec::new(),
            finalize: true,
        }
    }

    pub fn define(declaration: Declaration, value: ValueExpr) -> Self {
        Clause::Define {
            declaration,
            value: Some(value),
        }
    }

    pub fn begin<E: ClauseEmitter<Node = N>>(&self, emitter: &mut E) -> Result<()> {
        match self {
            Clause::Assign { value, target } => assign(emitter.stream(), value, target),
            Clause::Define { declaration, value } => {
                define_begin(emitter.stream(), declaration, value.as_ref())
            }
            Clause::Condition {
                value,
                clauses,
                finalize,
            } => {
                let temp = emitter.stream().save();
                assign(emitter.stream(), value, &Target::Temp(temp))?;
                emitter.stream().write(Line::If(Expr::Temp(temp)));
                emitter.stream().indent();
                if !clauses.is_empty() {
                    begin_all(clauses, emitter)?;
                    if *finalize {
                        end_all(clauses, emitter)?;
                    }
                    emitter.stream().outdent()?;
                }
                Ok(())
            }
            Clause::Else { clauses } => {
                emitter.stream().write(Line::Else);
                emitter.stream().indent();
                if !clauses.is_empty() {
                    begin_all(clauses, emitter)?;
                    end_all(clauses, emitter)?;
                    emitter.stream().outdent()?;
                }
                Ok(())
            }
            Clause::Group { clauses, defer } => {
                if !defer {
                    begin_all(clauses, emitter)?;
                    end_all(clauses, emitter)?;
                }
                Ok(())
            }
            Clause::Visit(node) => emitter.visit(node),
            Clause::Tag(tag) => tag_begin(emitter.stream(), tag),
            Clause::Repeat {
                declaration,
                value,
                repeatdict,
            } => {
                let stream = emitter.stream();
                let iterator = stream.save();
                assign(stream, value, &Target::Temp(iterator))?;
                define_begin(stream, declaration, None)?;
                let repeat = if *repeatdict && !declaration.is_unpacking() {
                    declaration.names.first().cloned()
                } else {
                    None
                };
                stream.write(Line::Loop {
                    target: declaration_target(declaration),
                    iterable: Expr::Temp(iterator),
                    repeat,
                });
                stream.indent();
                Ok(())
            }
            Clause::Write(value) => write(emitter.stream(), value, !value.is_escaped()),
            Clause::UnicodeWrite(value) => write(emitter.stream(), value, true),
            Clause::Out { text, defer } => {
                if !defer {
                    emitter.stream().out(text);
                }
                Ok(())
            }
            Clause::Method { name, args } => {
                let stream = emitter.stream();
                stream.write(Line::Def {
                    name: name.clone(),
                    args: args.clone(),
                });
                stream.indent();
                stream.scope.push(args.iter().cloned().collect::<Scope>());
                Ok(())
            }
            Clause::Translate {
                msgid,
                mapping,
                default,
                target,
            } => translate(emitter.stream(), msgid, mapping, default, target),
            Clause::Capture { target, clauses } => {
                emitter.stream().write(Line::Capture(target.clone()));
                emitter.stream().indent();
                begin_all(clauses, emitter)?;
                end_all(clauses, emitter)?;
                emitter.stream().outdent()
            }
        }
    }

    pub fn end<E: ClauseEmitter<Node = N>>(&self, emitter: &mut E) -> Result<()> {
        match self {
            Clause::Define { declaration, value } => {
                define_end(emitter.stream(), declaration, value.as_ref())
            }
            Clause::Condition {
                clauses, finalize, ..
            } => {
                let temp = emitter.stream().restore()?;
                if clauses.is_empty() {
                    emitter.stream().outdent()?;
                } else if !finalize {
                    emitter.stream().write(Line::If(Expr::Temp(temp)));
                    emitter.stream().indent();
                    end_all(clauses, emitter)?;
                    emitter.stream().outdent()?;
                }
                Ok(())
            }
            Clause::Else { clauses } => {
                if clauses.is_empty() {
                    emitter.stream().outdent()?;
                }
                Ok(())
            }
            Clause::Group { clauses, defer } => {
                if *defer {
                    begin_all(clauses, emitter)?;
                    end_all(clauses, emitter)?;
                }
                Ok(())
            }
            Clause::Tag(tag) => {
                if !tag.selfclosing {
                    emitter.stream().out(&format!("</{}>", tag.name));
                }
                Ok(())
            }
            Clause::Repeat { declaration, .. } => {
                let stream = emitter.stream();
                stream.outdent()?;
                define_end(stream, declaration, None)?;
                stream.restore()?;
                Ok(())
            }
            Clause::Out { text, defer } => {
                if *defer {
                    emitter.stream().out(text);
                }
                Ok(())
            }
            Clause::Method { .. } => {
                let stream = emitter.stream();
                stream.scope.pop();
                stream.outdent()
            }
            Clause::Assign { .. }
            | Clause::Visit(_)
            | Clause::Write(_)
            | Clause::UnicodeWrite(_)
            | Clause::Translate { .. }
            | Clause::Capture { .. } => Ok(()),
        }
    }
}

pub fn begin_all<N: fmt::Debug, E: ClauseEmitter<Node = N>>(
    clauses: &[Clause<N>],
    emitter: &mut E,
) -> Result<()> {
    for clause in clauses {
        clause.begin(emitter)?;
    }
    Ok(())
}

pub fn end_all<N: fmt::Debug, E: ClauseEmitter<Node = N>>(
    clauses: &[Clause<N>],
    emitter: &mut E,
) -> Result<()> {
    for clause in clauses.iter().rev() {
        clause.end(emitter)?;
    }
    Ok(())
}

fn declaration_target(declaration: &Declaration) -> Target {
    if declaration.is_unpacking() {
        Target::Unpack(declaration.names.to_vec())
    } else {
        Target::Var(declaration.names.first().cloned().unwrap_or_default())
    }
}

/// Emit an assignment of `value` to `target`. Alternatives become a chain of
/// guarded attempts where only the last one is unguarded.
pub fn assign(stream: &mut CodeStream, value: &ValueExpr, target: &Target) -> Result<()> {
    match value.unwrap_escape() {
        ValueExpr::Parts(alternatives) => {
            let Some((last, guarded)) = alternatives.split_last() else {
                stream.write(Line::Assign {
                    target: target.clone(),
                    value: Expr::none(),
                });
                return Ok(());
            };
            for alternative in guarded {
                stream.write(Line::Try);
                stream.indent();
                assign(stream, alternative, target)?;
                stream.outdent()?;
                stream.write(Line::Except);
                stream.indent();
            }
            assign(stream, last, target)?;
            for _ in guarded {
                stream.outdent()?;
            }
            Ok(())
        }
        ValueExpr::Value(single) => {
            stream.annotate(&single.source);
            stream.register(value);
            stream.write(Line::Assign {
                target: target.clone(),
                value: single.expr.clone(),
            });
            Ok(())
        }
        ValueExpr::Join(parts) => {
            stream.annotate(&value.source());
            stream.register(value);
            let mut exprs = Vec::with_capacity(parts.len());
            let mut temps = 0;
            for part in parts {
                match part {
                    JoinPart::Literal(text) => exprs.push(Expr::str(text.clone())),
                    JoinPart::Value(inner) => match inner.unwrap_escape() {
                        ValueExpr::Value(single) => exprs.push(single.expr.clone()),
                        nested => {
                            let temp = stream.save();
                            assign(stream, nested, &Target::Temp(temp))?;
                            exprs.push(Expr::Temp(temp));
                            temps += 1;
                        }
                    },
                }
            }
            stream.write(Line::Assign {
                target: target.clone(),
                value: Expr::Concat(exprs),
            });
            for _ in 0..temps {
                stream.restore()?;
            }
            Ok(())
        }
        ValueExpr::Escape(inner) => assign(stream, inner, target),
    }
}

/// Save shadowed names, then assign. Global declarations skip the
/// save/restore and leave the name bound in the execution scope.
fn define_begin(
    stream: &mut CodeStream,
    declaration: &Declaration,
    value: Option<&ValueExpr>,
) -> Result<()> {
    let target = declaration_target(declaration);
    if declaration.global_scope {
        for name in &declaration.names {
            for scope in stream.scope.iter_mut() {
                scope.shift_remove(name);
            }
        }
        if let Some(value) = value {
            assign(stream, value, &target)?;
        }
        return Ok(());
    }

    for name in &declaration.names {
        let temp = stream.save();
        let owned = !stream.scope.last().map_or(false, |scope| scope.contains(name));
        if owned {
            if stream.is_bound_outside(name) {
                stream.write(Line::Assign {
                    target: Target::Temp(temp),
                    value: Expr::name(name.clone()),
                });
            }
            stream.innermost().insert(name.clone());
        }
        stream.open_definition(owned);
    }
    if let Some(value) = value {
        assign(stream, value, &target)?;
    }
    Ok(())
}

fn define_end(
    stream: &mut CodeStream,
    declaration: &Declaration,
    _value: Option<&ValueExpr>,
) -> Result<()> {
    if declaration.global_scope {
        return Ok(());
    }
    for name in declaration.names.iter().rev() {
        let temp = stream.restore()?;
        if stream.close_definition()? {
            if stream.is_bound_outside(name) {
                stream.write(Line::Assign {
                    target: Target::Var(name.clone()),
                    value: Expr::Temp(temp),
                });
            } else {
                stream.write(Line::Unbind(name.clone()));
            }
            stream.innermost().shift_remove(name);
        }
    }
    Ok(())
}

fn tag_begin(stream: &mut CodeStream, tag: &Tag) -> Result<()> {
    stream.out(&format!("<{}", tag.name));

    let mut statics: Vec<(String, String)> = tag.attributes.clone();
    statics.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some(map) = &tag.attribute_map {
        let temp = stream.save();
        assign(stream, map, &Target::Temp(temp))?;
        stream.write(Line::AttributeMap {
            value: Expr::Temp(temp),
            statics,
        });
        stream.restore()?;
    } else {
        for (name, value) in &statics {
            stream.out(&format!(" {}=\"{}\"", name, escape_attribute(value)));
        }
    }

    for (name, value) in &tag.dynamic {
        let temp = stream.save();
        assign(stream, value, &Target::Temp(temp))?;
        stream.write(Line::Attribute {
            name: name.clone(),
            value: Expr::Temp(temp),
        });
        stream.restore()?;
    }

    stream.out(if tag.selfclosing { " />" } else { ">" });
    Ok(())
}

fn write(stream: &mut CodeStream, value: &ValueExpr, structure: bool) -> Result<()> {
    if let ValueExpr::Value(single) = value.unwrap_escape() {
        stream.annotate(&single.source);
        stream.register(value);
        stream.write(Line::Write {
            value: single.expr.clone(),
            structure,
        });
        return Ok(());
    }
    let temp = stream.save();
    assign(stream, value, &Target::Temp(temp))?;
    stream.write(Line::Write {
        value: Expr::Temp(temp),
        structure,
    });
    stream.restore()?;
    Ok(())
}

fn translate(
    stream: &mut CodeStream,
    msgid: &ValueExpr,
    mapping: &Option<Expr>,
    default: &Option<Expr>,
    target: &Target,
) -> Result<()> {
    let (msgid_expr, temp) = match msgid.unwrap_escape() {
        ValueExpr::Value(single) => {
            stream.register(msgid);
            (single.expr.clone(), None)
        }
        other => {
            let temp = stream.save();
            assign(stream, other, &Target::Temp(temp))?;
            (Expr::Temp(temp), Some(temp))
        }
    };
    let symbols = stream.symbols.clone();
    let call = Expr::helper(
        symbols.translate,
        vec![
            msgid_expr,
            Expr::name(symbols.domain),
            mapping.clone().unwrap_or_else(Expr::none),
            Expr::name(symbols.language),
            default.clone().unwrap_or_else(Expr::none),
        ],
    );
    let value = ValueExpr::Value(
        Value::new(call.clone(), format!("translate {}", msgid.source()))
            .with_symbol(symbols.translate, Symbol::Translate),
    );
    stream.register(&value);
    stream.write(Line::Assign {
        target: target.clone(),
        value: call,
    });
    if temp.is_some() {
        stream.restore()?;
    }
    Ok(())
}
