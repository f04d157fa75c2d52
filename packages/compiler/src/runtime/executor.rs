//! Program Executor
//!
//! Walks a program's statement tree against a per-render frame. Each render
//! gets its own frame, repeat dict and marker, so a compiled program can be
//! rendered from many threads at once.

use indexmap::IndexMap;
use std::sync::Arc;

use super::escape::{escape_attribute, escape_text};
use super::repeat::{RepeatDict, RepeatItem};
use super::value::{HostObject, Kwargs, Params, Value};
use crate::error::{EvalError, RenderError};
use crate::output::program::{Block, Stmt, StmtKind, Target};
use crate::output::Program;
use crate::template::Environment;

/// Renders `xi:include` targets for the program being executed.
pub trait IncludeResolver: Send + Sync {
    fn include(&self, href: &str, as_text: bool, context: Params) -> Result<Value, EvalError>;
}

/// The "not found" sentinel handed to translation lookups. One instance is
/// created per render and compared by identity.
#[derive(Debug)]
pub struct Marker;

impl HostObject for Marker {
    fn type_name(&self) -> &str {
        "Marker"
    }

    fn is_true(&self) -> bool {
        false
    }
}

pub struct Frame {
    pub locals: IndexMap<String, Value>,
    temps: Vec<Value>,
    streams: Vec<String>,
    pub repeat: RepeatDict,
    pub marker: Value,
}

impl Frame {
    fn new(locals: IndexMap<String, Value>, temporaries: usize, marker: Value) -> Self {
        Frame {
            locals,
            temps: vec![Value::None; temporaries],
            streams: vec![String::new()],
            repeat: RepeatDict::new(),
            marker,
        }
    }

    pub fn temp(&self, index: usize) -> Result<Value, RenderError> {
        self.temps
            .get(index)
            .cloned()
            .ok_or_else(|| RenderError::Internal(format!("temporary _tmp{} out of range", index)))
    }

    /// Locals a nested render may see.
    pub fn visible_locals(&self) -> Params {
        self.locals
            .iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn write(&mut self, text: &str) {
        if let Some(stream) = self.streams.last_mut() {
            stream.push_str(text);
        }
    }

    fn buffer_len(&self) -> usize {
        self.streams.last().map_or(0, String::len)
    }

    fn truncate(&mut self, len: usize) {
        if let Some(stream) = self.streams.last_mut() {
            stream.truncate(len);
        }
    }
}

/// A program bound to the environment and include resolver it renders with.
#[derive(Clone)]
pub struct Runtime {
    pub program: Arc<Program>,
    pub env: Arc<Environment>,
    pub include: Option<Arc<dyn IncludeResolver>>,
}

impl Runtime {
    pub fn new(program: Arc<Program>, env: Arc<Environment>) -> Self {
        Runtime {
            program,
            env,
            include: None,
        }
    }

    pub fn with_include(mut self, resolver: Arc<dyn IncludeResolver>) -> Self {
        self.include = Some(resolver);
        self
    }

    /// Render the program with `params` bound as locals.
    pub fn render(&self, params: Params) -> Result<String, RenderError> {
        let symbols = &self.env.symbols;
        let mut locals = params;
        locals
            .entry(symbols.domain.to_string())
            .or_insert(Value::None);
        if !locals.contains_key(symbols.language) {
            let negotiated = if self.env.config.disable_i18n() {
                None
            } else {
                self.env
                    .translation_service()
                    .and_then(|service| service.negotiate())
            };
            locals.insert(symbols.language.to_string(), Value::from(negotiated));
        }

        for (name, selection) in &self.program.selectors {
            locals.insert(name.clone(), Value::object(selection.clone()));
        }

        let marker = Value::Object(Arc::new(Marker));
        let mut frame = Frame::new(locals, self.program.temporaries, marker);
        self.exec_block(&mut frame, &self.program.body)?;
        frame
            .streams
            .pop()
            .ok_or_else(|| RenderError::Internal("output stream stack is empty".into()))
    }

    fn exec_block(&self, frame: &mut Frame, block: &[Stmt]) -> Result<(), RenderError> {
        for stmt in block {
            self.exec(frame, stmt).map_err(|err| self.annotate(err, stmt))?;
        }
        Ok(())
    }

    /// In debug mode, name the directive an evaluation error came from.
    fn annotate(&self, err: RenderError, stmt: &Stmt) -> RenderError {
        if !self.env.config.debug() || err.is_annotated() || err.evaluation().is_none() {
            return err;
        }
        match self.program.annotation_for(stmt.line) {
            Some((line, directive)) => RenderError::Annotated {
                directive: directive.to_string(),
                line,
                source: Box::new(err),
            },
            None => err,
        }
    }

    fn exec(&self, frame: &mut Frame, stmt: &Stmt) -> Result<(), RenderError> {
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                let value = self.eval(frame, value)?;
                self.assign(frame, target, value)?;
            }
            StmtKind::Unbind(name) => {
                frame.locals.shift_remove(name);
            }
            StmtKind::Literal(text) => frame.write(text),
            StmtKind::Write { value, structure } => {
                let value = self.eval(frame, value)?;
                match &value {
                    Value::None => {}
                    Value::Markup(text) => frame.write(text),
                    other if *structure => frame.write(&other.to_text()),
                    other => frame.write(&escape_text(&other.to_text())),
                }
            }
            StmtKind::Attribute { name, value } => {
                let value = self.eval(frame, value)?;
                if let Some(text) = attribute_text(&value) {
                    frame.write(&format!(" {}=\"{}\"", name, text));
                }
            }
            StmtKind::AttributeMap { value, statics } => {
                let value = self.eval(frame, value)?;
                let mut attributes: IndexMap<String, Value> = statics
                    .iter()
                    .map(|(name, value)| (name.clone(), Value::str(value)))
                    .collect();
                match &value {
                    Value::Map(entries) => {
                        for (name, value) in entries.iter() {
                            if value.is_none() {
                                attributes.shift_remove(name);
                            } else {
                                attributes.insert(name.clone(), value.clone());
                            }
                        }
                    }
                    Value::None => {}
                    other => {
                        return Err(EvalError::type_error(format!(
                            "attribute mapping must be a dict, not '{}'",
                            other.type_name()
                        ))
                        .into())
                    }
                }
                for (name, value) in &attributes {
                    if let Some(text) = attribute_text(value) {
                        frame.write(&format!(" {}=\"{}\"", name, text));
                    }
                }
            }
            StmtKind::If { test, body, orelse } => {
                if self.eval(frame, test)?.is_true() {
                    self.exec_block(frame, body)?;
                } else if let Some(orelse) = orelse {
                    self.exec_block(frame, orelse)?;
                }
            }
            StmtKind::Try { body, handler } => {
                let mark = frame.buffer_len();
                match self.exec_block(frame, body) {
                    Ok(()) => {}
                    Err(err) if err.is_recoverable() => {
                        log::trace!("alternative failed, trying the next: {}", err);
                        frame.truncate(mark);
                        self.exec_block(frame, handler)?;
                    }
                    Err(err) => return Err(err),
                }
            }
            StmtKind::Loop {
                target,
                iterable,
                repeat,
                body,
            } => {
                let iterable = self.eval(frame, iterable)?;
                let length = iterable.len();
                let items = iterable.iterate()?;
                let previous = repeat.as_ref().and_then(|key| frame.repeat.get(key));
                let result = self.iterate(frame, target, items, length, repeat.as_deref(), body);
                if let Some(key) = repeat {
                    frame.repeat.reset(key, previous);
                }
                result?;
            }
            StmtKind::Def { name, args, body } => {
                let callable = self.define(frame, name, args, body);
                frame.locals.insert(name.clone(), callable);
            }
            StmtKind::Capture { target, body } => {
                frame.streams.push(String::new());
                let result = self.exec_block(frame, body);
                let captured = frame.streams.pop().unwrap_or_default();
                result?;
                self.assign(frame, target, Value::markup(captured))?;
            }
        }
        Ok(())
    }

    fn iterate(
        &self,
        frame: &mut Frame,
        target: &Target,
        items: impl Iterator<Item = Value>,
        length: Option<usize>,
        repeat: Option<&str>,
        body: &[Stmt],
    ) -> Result<(), RenderError> {
        for (index, item) in items.enumerate() {
            if let Some(key) = repeat {
                frame.repeat.set(key, RepeatItem::new(index, length));
            }
            self.assign(frame, target, item)?;
            self.exec_block(frame, body)?;
        }
        Ok(())
    }

    fn assign(&self, frame: &mut Frame, target: &Target, value: Value) -> Result<(), RenderError> {
        match target {
            Target::Var(name) => {
                frame.locals.insert(name.clone(), value);
            }
            Target::Temp(index) => {
                let slot = frame.temps.get_mut(*index).ok_or_else(|| {
                    RenderError::Internal(format!("temporary _tmp{} out of range", index))
                })?;
                *slot = value;
            }
            Target::Unpack(names) => {
                let items: Vec<Value> = value.iterate()?.collect();
                if items.len() != names.len() {
                    return Err(EvalError::type_error(format!(
                        "cannot unpack {} values into {} names",
                        items.len(),
                        names.len()
                    ))
                    .into());
                }
                for (name, item) in names.iter().zip(items) {
                    frame.locals.insert(name.clone(), item);
                }
            }
            Target::Item { var, key } => match frame.locals.get_mut(var) {
                Some(Value::Map(entries)) => {
                    Arc::make_mut(entries).insert(key.clone(), value);
                }
                _ => {
                    return Err(RenderError::Internal(format!(
                        "{} is not a mapping",
                        var
                    )))
                }
            },
        }
        Ok(())
    }

    /// Bind a nested routine. It closes over the locals visible at the point
    /// of definition and renders its body into a fresh buffer per call.
    fn define(&self, frame: &Frame, name: &str, args: &[String], body: &Arc<Block>) -> Value {
        let runtime = self.clone();
        let closure = frame.locals.clone();
        let marker = frame.marker.clone();
        let params = args.to_vec();
        let body = Arc::clone(body);
        let routine = name.to_string();
        Value::function(name, move |values: Vec<Value>, kwargs: Kwargs| {
            if values.len() > params.len() {
                return Err(EvalError::type_error(format!(
                    "{}() takes {} arguments but {} were given",
                    routine,
                    params.len(),
                    values.len()
                )));
            }
            let mut locals = closure.clone();
            let mut values = values.into_iter();
            for param in &params {
                let value = match values.next() {
                    Some(value) => value,
                    None => kwargs.get(param).cloned().ok_or_else(|| {
                        EvalError::type_error(format!(
                            "{}() missing required argument '{}'",
                            routine, param
                        ))
                    })?,
                };
                locals.insert(param.clone(), value);
            }
            let mut frame = Frame::new(locals, runtime.program.temporaries, marker.clone());
            runtime
                .exec_block(&mut frame, &body)
                .map_err(render_to_eval)?;
            Ok(Value::markup(frame.streams.pop().unwrap_or_default()))
        })
    }
}

fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::None | Value::Bool(false) => None,
        Value::Markup(text) => Some(text.to_string()),
        other => Some(escape_attribute(&other.to_text()).into_owned()),
    }
}

/// Errors crossing a callable boundary travel as evaluation errors.
pub(crate) fn render_to_eval(err: RenderError) -> EvalError {
    match err {
        RenderError::Eval(err) => err,
        other => EvalError::Template(Box::new(other.into())),
    }
}
