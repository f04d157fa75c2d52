//! Expression Evaluation
//!
//! Evaluates `Expr` trees against a render frame. Helper calls are
//! dispatched through the program's symbol table to the services bound for
//! the current render.

use indexmap::IndexMap;
use std::cmp::Ordering;

use super::builtins;
use super::executor::{Frame, Runtime};
use super::i18n::fast_translate;
use super::providers::render_provider;
use super::traverse::{call_value, lookup_attr, lookup_item, traverse_path};
use super::value::{Kwargs, Params, Value};
use crate::error::{EvalError, RenderError};
use crate::expression_parser::{BinaryOperator, Expr, UnaryOperator};
use crate::output::Symbol;

impl Runtime {
    pub(crate) fn eval(&self, frame: &Frame, expr: &Expr) -> Result<Value, RenderError> {
        Ok(match expr {
            Expr::Literal(literal) => Value::from_literal(literal),
            Expr::Name(name) => self.lookup_name(frame, name)?,
            Expr::Temp(index) => frame.temp(*index)?,
            Expr::Attribute { receiver, name } => {
                let receiver = self.eval(frame, receiver)?;
                lookup_attr(&receiver, name)?
            }
            Expr::Subscript { receiver, key } => {
                let receiver = self.eval(frame, receiver)?;
                let key = self.eval(frame, key)?;
                lookup_item(&receiver, &key)?
            }
            Expr::Call {
                callee,
                args,
                kwargs,
            } => {
                let callee = self.eval(frame, callee)?;
                let args = self.eval_all(frame, args)?;
                let kwargs = self.eval_kwargs(frame, kwargs)?;
                call_value(&callee, args, kwargs)?
            }
            Expr::Unary { operator, expr } => {
                let value = self.eval(frame, expr)?;
                unary(*operator, value)?
            }
            Expr::Binary {
                operator: BinaryOperator::And,
                left,
                right,
            } => {
                let left = self.eval(frame, left)?;
                if left.is_true() {
                    self.eval(frame, right)?
                } else {
                    left
                }
            }
            Expr::Binary {
                operator: BinaryOperator::Or,
                left,
                right,
            } => {
                let left = self.eval(frame, left)?;
                if left.is_true() {
                    left
                } else {
                    self.eval(frame, right)?
                }
            }
            Expr::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.eval(frame, left)?;
                let right = self.eval(frame, right)?;
                binary(*operator, &left, &right)?
            }
            Expr::Conditional {
                condition,
                true_exp,
                false_exp,
            } => {
                if self.eval(frame, condition)?.is_true() {
                    self.eval(frame, true_exp)?
                } else {
                    self.eval(frame, false_exp)?
                }
            }
            Expr::List(items) => Value::list(self.eval_all(frame, items)?),
            Expr::Dict(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval(frame, key)?.to_text().into_owned();
                    map.insert(key, self.eval(frame, value)?);
                }
                Value::map(map)
            }
            Expr::Concat(parts) => {
                let mut text = String::new();
                for part in parts {
                    text.push_str(&self.eval(frame, part)?.to_text());
                }
                Value::str(text)
            }
            Expr::Helper {
                symbol,
                args,
                kwargs,
            } => self.call_helper(frame, symbol, args, kwargs)?,
            Expr::Symbol(name) => match self.symbol(name)? {
                Symbol::Marker => frame.marker.clone(),
                other => {
                    return Err(RenderError::Internal(format!(
                        "helper {:?} cannot be used as a value",
                        other
                    )))
                }
            },
        })
    }

    fn eval_all(&self, frame: &Frame, exprs: &[Expr]) -> Result<Vec<Value>, RenderError> {
        exprs.iter().map(|expr| self.eval(frame, expr)).collect()
    }

    fn eval_kwargs(&self, frame: &Frame, kwargs: &[(String, Expr)]) -> Result<Kwargs, RenderError> {
        kwargs
            .iter()
            .map(|(name, expr)| Ok((name.clone(), self.eval(frame, expr)?)))
            .collect()
    }

    fn lookup_name(&self, frame: &Frame, name: &str) -> Result<Value, EvalError> {
        if let Some(value) = frame.locals.get(name) {
            return Ok(value.clone());
        }
        if name == self.env.symbols.repeat {
            return Ok(frame.repeat.snapshot());
        }
        builtins::lookup(name).ok_or_else(|| EvalError::Name(name.to_string()))
    }

    fn symbol(&self, name: &str) -> Result<Symbol, RenderError> {
        self.program
            .symbols
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::Internal(format!("unbound helper symbol {}", name)))
    }

    fn call_helper(
        &self,
        frame: &Frame,
        name: &str,
        args: &[Expr],
        kwargs: &[(String, Expr)],
    ) -> Result<Value, RenderError> {
        match self.symbol(name)? {
            Symbol::Exists => {
                let target = args
                    .first()
                    .ok_or_else(|| RenderError::Internal("exists helper without path".into()))?;
                match self.eval(frame, target) {
                    Ok(_) => Ok(Value::Bool(true)),
                    Err(err) if err.is_recoverable() => Ok(Value::Bool(false)),
                    Err(err) => Err(err),
                }
            }
            Symbol::Traverse => {
                let mut values = self.eval_all(frame, args)?.into_iter();
                let (Some(base), Some(call)) = (values.next(), values.next()) else {
                    return Err(RenderError::Internal("malformed path helper call".into()));
                };
                let segments: Vec<Value> = values.collect();
                Ok(traverse_path(base, &segments, call.is_true())?)
            }
            Symbol::ContentProvider => {
                let name = self.single_argument(frame, args)?;
                Ok(render_provider(
                    self.env.providers(),
                    &name.to_text(),
                    &frame.visible_locals(),
                )?)
            }
            Symbol::Translate => {
                let values = self.eval_all(frame, args)?;
                let [msgid, domain, mapping, language, default]: [Value; 5] =
                    values.try_into().map_err(|_| {
                        RenderError::Internal("translate helper expects five arguments".into())
                    })?;
                Ok(self.translate(&msgid, &domain, &mapping, &language, &default))
            }
            Symbol::Include => {
                let mut values = self.eval_all(frame, args)?.into_iter();
                let href = values.next().unwrap_or_default();
                let parse = values.next().unwrap_or_default();
                let mut context = frame.visible_locals();
                context.extend(self.eval_kwargs(frame, kwargs)?);
                self.include(&href.to_text(), parse.as_str() == Some("text"), context)
            }
            Symbol::Marker => Err(RenderError::Internal(
                "marker symbol is not callable".into(),
            )),
        }
    }

    fn single_argument(&self, frame: &Frame, args: &[Expr]) -> Result<Value, RenderError> {
        match args {
            [only] => self.eval(frame, only),
            _ => Err(RenderError::Internal(format!(
                "helper expects one argument, got {}",
                args.len()
            ))),
        }
    }

    fn translate(
        &self,
        msgid: &Value,
        domain: &Value,
        mapping: &Value,
        language: &Value,
        default: &Value,
    ) -> Value {
        let mapping = match mapping {
            Value::Map(entries) => Some(entries.as_ref()),
            _ => None,
        };
        let service = if self.env.config.disable_i18n() {
            None
        } else {
            self.env.translation_service()
        };
        let Some(service) = service else {
            return fast_translate(msgid, mapping, default);
        };
        let key = msgid.to_text();
        match service.translate(&key, domain.as_str(), mapping, language.as_str()) {
            Some(translation) => Value::str(translation),
            None => fast_translate(msgid, mapping, default),
        }
    }

    fn include(&self, href: &str, as_text: bool, context: Params) -> Result<Value, RenderError> {
        let resolver = self.include.as_ref().ok_or_else(|| {
            EvalError::type_error(format!("cannot include '{}' outside a file template", href))
        })?;
        Ok(resolver.include(href, as_text, context)?)
    }
}

fn unary(operator: UnaryOperator, value: Value) -> Result<Value, EvalError> {
    match (operator, &value) {
        (UnaryOperator::Not, _) => Ok(Value::Bool(!value.is_true())),
        (UnaryOperator::Minus, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| EvalError::overflow("integer negation out of range")),
        (UnaryOperator::Minus, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOperator::Plus, Value::Int(_) | Value::Float(_)) => Ok(value),
        (operator, other) => Err(EvalError::type_error(format!(
            "bad operand type for unary {}: '{}'",
            operator,
            other.type_name()
        ))),
    }
}

fn unsupported(operator: BinaryOperator, left: &Value, right: &Value) -> EvalError {
    EvalError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        operator,
        left.type_name(),
        right.type_name()
    ))
}

/// Longest string or sequence an expression may build.
pub const MAX_SEQUENCE_LENGTH: usize = 1 << 24;

fn checked_int(operator: BinaryOperator, result: Option<i64>) -> Result<Value, EvalError> {
    result
        .map(Value::Int)
        .ok_or_else(|| EvalError::overflow(format!("integer result of {} out of range", operator)))
}

fn repeat_text(text: &str, times: i64) -> Result<Value, EvalError> {
    let times = usize::try_from(times).unwrap_or(0);
    match text.len().checked_mul(times) {
        Some(length) if length <= MAX_SEQUENCE_LENGTH => Ok(Value::str(text.repeat(times))),
        _ => Err(EvalError::overflow("repeated string is too long")),
    }
}

pub fn binary(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvalError> {
    use BinaryOperator::*;
    Ok(match operator {
        Add => match (left, right) {
            (Value::Int(a), Value::Int(b)) => checked_int(operator, a.checked_add(*b))?,
            (Value::Str(a) | Value::Markup(a), Value::Str(b) | Value::Markup(b)) => {
                Value::str(format!("{}{}", a, b))
            }
            (Value::List(a), Value::List(b)) => {
                Value::list(a.iter().chain(b.iter()).cloned().collect())
            }
            _ => float_op(operator, left, right, |a, b| a + b)?,
        },
        Sub => match (left, right) {
            (Value::Int(a), Value::Int(b)) => checked_int(operator, a.checked_sub(*b))?,
            _ => float_op(operator, left, right, |a, b| a - b)?,
        },
        Mul => match (left, right) {
            (Value::Int(a), Value::Int(b)) => checked_int(operator, a.checked_mul(*b))?,
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => repeat_text(s, *n)?,
            _ => float_op(operator, left, right, |a, b| a * b)?,
        },
        Div => {
            let (a, b) = floats(operator, left, right)?;
            if b == 0.0 {
                return Err(EvalError::ZeroDivision);
            }
            Value::Float(a / b)
        }
        FloorDiv => match (left.as_int(), right.as_int()) {
            (Some(_), Some(0)) => return Err(EvalError::ZeroDivision),
            (Some(a), Some(b)) => {
                let quotient = a.checked_div(b).ok_or_else(|| {
                    EvalError::overflow(format!("integer result of {} out of range", operator))
                })?;
                // The remainder of `i64::MIN / -1` is zero.
                Value::Int(if a.wrapping_rem(b) != 0 && (a < 0) != (b < 0) {
                    quotient - 1
                } else {
                    quotient
                })
            }
            _ => {
                let (a, b) = floats(operator, left, right)?;
                if b == 0.0 {
                    return Err(EvalError::ZeroDivision);
                }
                Value::Float((a / b).floor())
            }
        },
        Mod => match (left.as_int(), right.as_int()) {
            (Some(_), Some(0)) => return Err(EvalError::ZeroDivision),
            (Some(a), Some(b)) => {
                let r = a.wrapping_rem(b);
                Value::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
            }
            _ => {
                let (a, b) = floats(operator, left, right)?;
                if b == 0.0 {
                    return Err(EvalError::ZeroDivision);
                }
                Value::Float(a - b * (a / b).floor())
            }
        },
        Eq => Value::Bool(left == right),
        NotEq => Value::Bool(left != right),
        Lt => Value::Bool(compare(left, right)? == Ordering::Less),
        LtE => Value::Bool(compare(left, right)? != Ordering::Greater),
        Gt => Value::Bool(compare(left, right)? == Ordering::Greater),
        GtE => Value::Bool(compare(left, right)? != Ordering::Less),
        In => Value::Bool(contains(right, left)?),
        NotIn => Value::Bool(!contains(right, left)?),
        Is => Value::Bool(left.is_same(right)),
        IsNot => Value::Bool(!left.is_same(right)),
        And => {
            if left.is_true() {
                right.clone()
            } else {
                left.clone()
            }
        }
        Or => {
            if left.is_true() {
                left.clone()
            } else {
                right.clone()
            }
        }
    })
}

fn floats(operator: BinaryOperator, left: &Value, right: &Value) -> Result<(f64, f64), EvalError> {
    match (left.as_float(), right.as_float()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(unsupported(operator, left, right)),
    }
}

fn float_op(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    op: impl Fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    let (a, b) = floats(operator, left, right)?;
    Ok(Value::Float(op(a, b)))
}

/// Ordering used by comparisons, `sorted`, `min` and `max`.
pub fn compare(left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    match (left, right) {
        (Value::Str(a) | Value::Markup(a), Value::Str(b) | Value::Markup(b)) => Ok(a.cmp(b)),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ordering = compare(x, y)?;
                if ordering != Ordering::Equal {
                    return Ok(ordering);
                }
            }
            Ok(a.len().cmp(&b.len()))
        }
        _ => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(|| {
                EvalError::type_error("cannot order NaN values")
            }),
            _ => Err(EvalError::type_error(format!(
                "'<' not supported between instances of '{}' and '{}'",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, EvalError> {
    match container {
        Value::Str(text) | Value::Markup(text) => Ok(text.contains(&*item.to_text())),
        Value::List(items) => Ok(items.iter().any(|candidate| candidate == item)),
        Value::Map(entries) => Ok(entries.contains_key(&*item.to_text())),
        other => Ok(other.iterate()?.any(|candidate| &candidate == item)),
    }
}
