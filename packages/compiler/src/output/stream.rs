//! Code Stream
//!
//! The buffer clauses write program lines into. Tracks indentation, queues
//! literal output so adjacent fragments become a single write, allocates
//! temporaries in strict LIFO order and keeps the stack of lexical scopes
//! used by definitions to save and restore shadowed names.

use indexmap::IndexSet;
use std::collections::BTreeMap;

use super::program::{EmittedLine, Line, Program, ProgramKind};
use super::value_expr::{SymbolMapping, ValueExpr};
use crate::config::Symbols;
use crate::error::{CompilerError, Result};

pub type Scope = IndexSet<String>;

#[derive(Debug)]
pub struct CodeStream {
    pub symbols: Symbols,
    lines: Vec<EmittedLine>,
    indentation: usize,
    queue: String,
    /// Stack of names bound in each open lexical block.
    pub scope: Vec<Scope>,
    t_counter: usize,
    t_high_water: usize,
    /// Per-name record of whether an open definition bound the name itself.
    definitions: Vec<bool>,
    annotations: BTreeMap<usize, String>,
    symbol_mapping: SymbolMapping,
}

impl CodeStream {
    /// Start a stream whose outermost scope holds the parameters and the
    /// reserved symbols.
    pub fn new(symbols: Symbols, parameters: &[String]) -> Self {
        let mut root = Scope::new();
        for name in symbols.reserved() {
            root.insert(name.to_string());
        }
        for name in parameters {
            root.insert(name.clone());
        }
        CodeStream {
            symbols,
            lines: Vec::new(),
            indentation: 0,
            queue: String::new(),
            scope: vec![root],
            t_counter: 0,
            t_high_water: 0,
            definitions: Vec::new(),
            annotations: BTreeMap::new(),
            symbol_mapping: SymbolMapping::new(),
        }
    }

    pub fn indentation(&self) -> usize {
        self.indentation
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn indent(&mut self) {
        self.cook();
        self.indentation += 1;
    }

    pub fn outdent(&mut self) -> Result<()> {
        self.cook();
        self.indentation = self.indentation.checked_sub(1).ok_or_else(|| {
            CompilerError::Internal("outdent below zero indentation".to_string())
        })?;
        Ok(())
    }

    /// Allocate the next temporary.
    pub fn save(&mut self) -> usize {
        self.t_counter += 1;
        self.t_high_water = self.t_high_water.max(self.t_counter);
        self.t_counter
    }

    /// Release the most recently allocated temporary and return it.
    pub fn restore(&mut self) -> Result<usize> {
        if self.t_counter == 0 {
            return Err(CompilerError::Internal(
                "temporary restored without a matching save".to_string(),
            ));
        }
        let temp = self.t_counter;
        self.t_counter -= 1;
        Ok(temp)
    }

    /// Queue literal output.
    pub fn out(&mut self, text: &str) {
        self.queue.push_str(text);
    }

    /// Flush queued literal output as a single write.
    pub fn cook(&mut self) {
        if !self.queue.is_empty() {
            let text = std::mem::take(&mut self.queue);
            self.push(Line::Literal(text));
        }
    }

    pub fn write(&mut self, line: Line) {
        self.cook();
        self.push(line);
    }

    fn push(&mut self, line: Line) {
        self.lines.push(EmittedLine {
            indent: self.indentation,
            line,
        });
    }

    /// Record that the next line originates from `directive`.
    pub fn annotate(&mut self, directive: &str) {
        self.cook();
        self.annotations
            .insert(self.lines.len(), directive.to_string());
    }

    /// Bind the helpers a value needs into the program's symbol table.
    pub fn register(&mut self, value: &ValueExpr) {
        value.collect_symbols(&mut self.symbol_mapping);
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.scope.iter().any(|scope| scope.contains(name))
    }

    /// Whether `name` is bound in a scope enclosing the innermost one.
    pub fn is_bound_outside(&self, name: &str) -> bool {
        let depth = self.scope.len().saturating_sub(1);
        self.scope[..depth].iter().any(|scope| scope.contains(name))
    }

    /// Record whether the definition being opened bound `name` in the
    /// innermost scope. Only that definition restores it.
    pub fn open_definition(&mut self, owned: bool) {
        self.definitions.push(owned);
    }

    pub fn close_definition(&mut self) -> Result<bool> {
        self.definitions.pop().ok_or_else(|| {
            CompilerError::Internal("definition closed without a matching open".to_string())
        })
    }

    pub fn innermost(&mut self) -> &mut Scope {
        if self.scope.is_empty() {
            self.scope.push(Scope::new());
        }
        let last = self.scope.len() - 1;
        &mut self.scope[last]
    }

    /// All bound names in binding order, excluding internal symbols.
    pub fn visible_names(&self) -> Vec<String> {
        let mut names = IndexSet::new();
        for scope in &self.scope {
            for name in scope {
                if !name.starts_with('_') {
                    names.insert(name.clone());
                }
            }
        }
        names.into_iter().collect()
    }

    /// The program text as written so far.
    pub fn source(&self) -> String {
        self.lines
            .iter()
            .map(|emitted| format!("{}{}", "    ".repeat(emitted.indent), emitted.line.to_source()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn finish(mut self, kind: ProgramKind, parameters: Vec<String>) -> Result<Program> {
        self.cook();
        if self.t_counter != 0 {
            return Err(CompilerError::Internal(format!(
                "{} temporaries left allocated",
                self.t_counter
            )));
        }
        if self.indentation != 0 {
            return Err(CompilerError::Internal(format!(
                "program ends at indentation {}",
                self.indentation
            )));
        }
        Program::assemble(
            kind,
            parameters,
            self.lines,
            self.symbol_mapping,
            self.annotations,
            self.t_high_water + 1,
        )
    }
}
