//! Program
//!
//! The executable form of a compiled template. The code stream emits a flat
//! list of indented lines; `assemble` folds them into a statement tree the
//! executor walks, while the lines themselves remain available as a
//! human-readable listing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::value_expr::SymbolMapping;
use crate::error::{CompilerError, Result};
use crate::expression_parser::serializer::quote;
use crate::expression_parser::Expr;
use crate::runtime::Selection;

const INDENT_WITH: &str = "    ";

/// Where an assignment stores its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Var(String),
    Temp(usize),
    Unpack(Vec<String>),
    /// Entry `key` of the mapping bound to `var`.
    Item { var: String, key: String },
}

impl Target {
    fn to_source(&self) -> String {
        match self {
            Target::Var(name) => name.clone(),
            Target::Temp(index) => format!("_tmp{}", index),
            Target::Unpack(names) => format!("({})", names.join(", ")),
            Target::Item { var, key } => format!("{}[{}]", var, quote(key)),
        }
    }
}

/// One emitted line of the program listing.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Assign { target: Target, value: Expr },
    Unbind(String),
    Literal(String),
    Write { value: Expr, structure: bool },
    Attribute { name: String, value: Expr },
    AttributeMap { value: Expr, statics: Vec<(String, String)> },
    If(Expr),
    Else,
    Try,
    Except,
    Loop {
        target: Target,
        iterable: Expr,
        repeat: Option<String>,
    },
    Def { name: String, args: Vec<String> },
    Capture(Target),
}

impl Line {
    pub fn opens_block(&self) -> bool {
        matches!(
            self,
            Line::If(_)
                | Line::Else
                | Line::Try
                | Line::Except
                | Line::Loop { .. }
                | Line::Def { .. }
                | Line::Capture(_)
        )
    }

    pub fn to_source(&self) -> String {
        match self {
            Line::Assign { target, value } => format!("{} = {}", target.to_source(), value),
            Line::Unbind(name) => format!("del {}", name),
            Line::Literal(text) => format!("_write({})", quote(text)),
            Line::Write { value, structure } => {
                if *structure {
                    format!("_write({})", value)
                } else {
                    format!("_write(escape({}))", value)
                }
            }
            Line::Attribute { name, value } => format!("_attribute({}, {})", quote(name), value),
            Line::AttributeMap { value, statics } => format!(
                "_attributes({}, {})",
                value,
                statics
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, quote(value)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Line::If(test) => format!("if {}:", test),
            Line::Else => "else:".to_string(),
            Line::Try => "try:".to_string(),
            Line::Except => "except:".to_string(),
            Line::Loop {
                target,
                iterable,
                repeat: Some(key),
            } => format!(
                "for {} in repeat.insert({}, {}):",
                target.to_source(),
                quote(key),
                iterable
            ),
            Line::Loop {
                target, iterable, ..
            } => format!("for {} in {}:", target.to_source(), iterable),
            Line::Def { name, args } => format!("def {}({}):", name, args.join(", ")),
            Line::Capture(target) => format!("with capture() as {}:", target.to_source()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmittedLine {
    pub indent: usize,
    pub line: Line,
}

pub type Block = Vec<Stmt>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// Index of the line in the program listing.
    pub line: usize,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Assign { target: Target, value: Expr },
    Unbind(String),
    Literal(String),
    Write { value: Expr, structure: bool },
    Attribute { name: String, value: Expr },
    AttributeMap { value: Expr, statics: Vec<(String, String)> },
    If {
        test: Expr,
        body: Block,
        orelse: Option<Block>,
    },
    Try { body: Block, handler: Block },
    Loop {
        target: Target,
        iterable: Expr,
        repeat: Option<String>,
        body: Block,
    },
    Def {
        name: String,
        args: Vec<String>,
        body: Arc<Block>,
    },
    Capture { target: Target, body: Block },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramKind {
    Template,
    Macro,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub kind: ProgramKind,
    pub parameters: Vec<String>,
    pub body: Block,
    /// Helper bindings the body references.
    pub symbols: SymbolMapping,
    /// Listing line → originating directive source.
    pub annotations: BTreeMap<usize, String>,
    /// Number of temporaries the body allocates.
    pub temporaries: usize,
    pub listing: Vec<String>,
    /// Snapshots of `py:match` targets, bound under their selector names.
    #[serde(default)]
    pub selectors: Vec<(String, Selection)>,
}

impl Program {
    pub fn assemble(
        kind: ProgramKind,
        parameters: Vec<String>,
        lines: Vec<EmittedLine>,
        symbols: SymbolMapping,
        annotations: BTreeMap<usize, String>,
        temporaries: usize,
    ) -> Result<Self> {
        let listing = lines
            .iter()
            .map(|emitted| {
                format!(
                    "{}{}",
                    INDENT_WITH.repeat(emitted.indent),
                    emitted.line.to_source()
                )
            })
            .collect();
        let mut assembler = Assembler {
            lines: &lines,
            pos: 0,
        };
        let body = assembler.block(0)?;
        if assembler.pos != lines.len() {
            return Err(CompilerError::Internal(format!(
                "unbalanced indentation at program line {}",
                assembler.pos
            )));
        }
        Ok(Program {
            kind,
            parameters,
            body,
            symbols,
            annotations,
            temporaries,
            listing,
            selectors: Vec::new(),
        })
    }

    /// The program as indented pseudo-source.
    pub fn source(&self) -> String {
        let mut source = self.listing.join("\n");
        source.push('\n');
        source
    }

    /// The directive that produced the code at `line`, if any.
    pub fn annotation_for(&self, line: usize) -> Option<(usize, &str)> {
        self.annotations
            .range(..=line)
            .next_back()
            .map(|(line, directive)| (*line, directive.as_str()))
    }

    /// Names of the helpers this program requires, in first-use order.
    pub fn required_helpers(&self) -> IndexMap<&str, super::value_expr::Symbol> {
        self.symbols
            .iter()
            .map(|(name, symbol)| (name.as_str(), *symbol))
            .collect()
    }
}

struct Assembler<'a> {
    lines: &'a [EmittedLine],
    pos: usize,
}

impl<'a> Assembler<'a> {
    fn block(&mut self, indent: usize) -> Result<Block> {
        let mut block = Vec::new();
        while let Some(emitted) = self.lines.get(self.pos) {
            if emitted.indent < indent {
                break;
            }
            if emitted.indent > indent {
                return Err(CompilerError::Internal(format!(
                    "unexpected indent at program line {}",
                    self.pos
                )));
            }
            let line = self.pos;
            self.pos += 1;
            let kind = match &emitted.line {
                Line::Assign { target, value } => StmtKind::Assign {
                    target: target.clone(),
                    value: value.clone(),
                },
                Line::Unbind(name) => StmtKind::Unbind(name.clone()),
                Line::Literal(text) => StmtKind::Literal(text.clone()),
                Line::Write { value, structure } => StmtKind::Write {
                    value: value.clone(),
                    structure: *structure,
                },
                Line::Attribute { name, value } => StmtKind::Attribute {
                    name: name.clone(),
                    value: value.clone(),
                },
                Line::AttributeMap { value, statics } => StmtKind::AttributeMap {
                    value: value.clone(),
                    statics: statics.clone(),
                },
                Line::If(test) => {
                    let body = self.block(indent + 1)?;
                    let orelse = if self.next_is(indent, |line| matches!(line, Line::Else)) {
                        self.pos += 1;
                        Some(self.block(indent + 1)?)
                    } else {
                        None
                    };
                    StmtKind::If {
                        test: test.clone(),
                        body,
                        orelse,
                    }
                }
                Line::Try => {
                    let body = self.block(indent + 1)?;
                    if !self.next_is(indent, |line| matches!(line, Line::Except)) {
                        return Err(CompilerError::Internal(format!(
                            "try block without handler at program line {}",
                            line
                        )));
                    }
                    self.pos += 1;
                    let handler = self.block(indent + 1)?;
                    StmtKind::Try { body, handler }
                }
                Line::Loop {
                    target,
                    iterable,
                    repeat,
                } => StmtKind::Loop {
                    target: target.clone(),
                    iterable: iterable.clone(),
                    repeat: repeat.clone(),
                    body: self.block(indent + 1)?,
                },
                Line::Def { name, args } => StmtKind::Def {
                    name: name.clone(),
                    args: args.clone(),
                    body: Arc::new(self.block(indent + 1)?),
                },
                Line::Capture(target) => StmtKind::Capture {
                    target: target.clone(),
                    body: self.block(indent + 1)?,
                },
                Line::Else | Line::Except => {
                    return Err(CompilerError::Internal(format!(
                        "dangling `{}` at program line {}",
                        emitted.line.to_source(),
                        line
                    )))
                }
            };
            block.push(Stmt { line, kind });
        }
        Ok(block)
    }

    fn next_is(&self, indent: usize, predicate: impl Fn(&Line) -> bool) -> bool {
        self.lines
            .get(self.pos)
            .map_or(false, |emitted| emitted.indent == indent && predicate(&emitted.line))
    }
}
