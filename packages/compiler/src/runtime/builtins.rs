//! Builtin functions visible to native expressions.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use super::eval::MAX_SEQUENCE_LENGTH;
use super::value::{Kwargs, Value};
use crate::error::EvalError;

type BuiltinFn = fn(Vec<Value>, Kwargs) -> Result<Value, EvalError>;

static BUILTINS: Lazy<IndexMap<&'static str, Value>> = Lazy::new(|| {
    let table: [(&'static str, BuiltinFn); 12] = [
        ("len", len as BuiltinFn),
        ("str", str as BuiltinFn),
        ("int", int as BuiltinFn),
        ("float", float as BuiltinFn),
        ("bool", bool as BuiltinFn),
        ("range", range as BuiltinFn),
        ("abs", abs as BuiltinFn),
        ("min", min as BuiltinFn),
        ("max", max as BuiltinFn),
        ("sorted", sorted as BuiltinFn),
        ("list", list as BuiltinFn),
        ("dict", dict as BuiltinFn),
    ];
    table
        .into_iter()
        .map(|(name, func)| (name, Value::function(name, func)))
        .collect()
});

pub fn lookup(name: &str) -> Option<Value> {
    BUILTINS.get(name).cloned()
}

fn single(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(EvalError::type_error(format!(
            "{}() takes exactly one argument",
            name
        ))),
    }
}

fn len(args: Vec<Value>, _: Kwargs) -> Result<Value, EvalError> {
    let value = single("len", args)?;
    value
        .len()
        .map(|n| Value::Int(n as i64))
        .ok_or_else(|| {
            EvalError::type_error(format!(
                "object of type '{}' has no len()",
                value.type_name()
            ))
        })
}

fn str(args: Vec<Value>, _: Kwargs) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Ok(Value::str(""));
    }
    Ok(Value::str(single("str", args)?.to_text()))
}

fn int(args: Vec<Value>, _: Kwargs) -> Result<Value, EvalError> {
    let value = single("int", args)?;
    match &value {
        Value::Int(_) => Ok(value),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(n) => float_to_int(*n),
        Value::Str(s) | Value::Markup(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            EvalError::type_error(format!("invalid literal for int(): {}", value.repr()))
        }),
        other => Err(EvalError::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn float_to_int(n: f64) -> Result<Value, EvalError> {
    if n.is_nan() {
        return Err(EvalError::type_error("cannot convert float NaN to integer"));
    }
    let truncated = n.trunc();
    // i64::MIN is exactly representable; i64::MAX is not.
    if truncated < -9_223_372_036_854_775_808.0 || truncated >= 9_223_372_036_854_775_808.0 {
        return Err(EvalError::overflow(format!(
            "cannot convert float {} to integer",
            n
        )));
    }
    Ok(Value::Int(truncated as i64))
}

fn float(args: Vec<Value>, _: Kwargs) -> Result<Value, EvalError> {
    let value = single("float", args)?;
    if let Some(n) = value.as_float() {
        return Ok(Value::Float(n));
    }
    value
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .map(Value::Float)
        .ok_or_else(|| EvalError::type_error(format!("could not convert to float: {}", value.repr())))
}

fn bool(args: Vec<Value>, _: Kwargs) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(single("bool", args)?.is_true()))
}

fn range(args: Vec<Value>, _: Kwargs) -> Result<Value, EvalError> {
    let ints = args
        .iter()
        .map(|arg| {
            arg.as_int()
                .ok_or_else(|| EvalError::type_error("range() arguments must be integers"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(EvalError::type_error("range() expects 1 to 3 arguments")),
    };
    if step == 0 {
        return Err(EvalError::type_error("range() step must not be zero"));
    }
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let span = if step > 0 { stop - start } else { start - stop };
    let length = if span > 0 {
        (span + step.abs() - 1) / step.abs()
    } else {
        0
    };
    if length > MAX_SEQUENCE_LENGTH as i128 {
        return Err(EvalError::overflow(format!(
            "range() of {} items is too long",
            length
        )));
    }
    // Every item lies between start and stop, so it fits in an i64.
    let items = (0..length)
        .map(|index| Value::Int((start + index * step) as i64))
        .collect();
    Ok(Value::list(items))
}

fn abs(args: Vec<Value>, _: Kwargs) -> Result<Value, EvalError> {
    match single("abs", args)? {
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| EvalError::overflow("abs() of the smallest integer")),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        other => Err(EvalError::type_error(format!(
            "bad operand type for abs(): '{}'",
            other.type_name()
        ))),
    }
}

fn items_of(name: &str, args: Vec<Value>) -> Result<Vec<Value>, EvalError> {
    if args.len() == 1 {
        Ok(args[0].iterate()?.collect())
    } else if args.is_empty() {
        Err(EvalError::type_error(format!("{}() expects an argument", name)))
    } else {
        Ok(args)
    }
}

fn extreme(name: &str, args: Vec<Value>, want: std::cmp::Ordering) -> Result<Value, EvalError> {
    let mut items = items_of(name, args)?.into_iter();
    let mut best = items
        .next()
        .ok_or_else(|| EvalError::type_error(format!("{}() arg is an empty sequence", name)))?;
    for item in items {
        if super::eval::compare(&item, &best)? == want {
            best = item;
        }
    }
    Ok(best)
}

fn min(args: Vec<Value>, _: Kwargs) -> Result<Value, EvalError> {
    extreme("min", args, std::cmp::Ordering::Less)
}

fn max(args: Vec<Value>, _: Kwargs) -> Result<Value, EvalError> {
    extreme("max", args, std::cmp::Ordering::Greater)
}

fn sorted(args: Vec<Value>, kwargs: Kwargs) -> Result<Value, EvalError> {
    let mut items: Vec<Value> = single("sorted", args)?.iterate()?.collect();
    let mut failure = None;
    items.sort_by(|a, b| match super::eval::compare(a, b) {
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            std::cmp::Ordering::Equal
        }
    });
    if let Some(err) = failure {
        return Err(err);
    }
    if kwargs.get("reverse").map_or(false, Value::is_true) {
        items.reverse();
    }
    Ok(Value::list(items))
}

fn list(args: Vec<Value>, _: Kwargs) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Ok(Value::list(Vec::new()));
    }
    Ok(Value::list(single("list", args)?.iterate()?.collect()))
}

fn dict(args: Vec<Value>, kwargs: Kwargs) -> Result<Value, EvalError> {
    let mut entries = IndexMap::new();
    if let Some(source) = args.into_iter().next() {
        match source {
            Value::Map(map) => entries.extend(map.iter().map(|(k, v)| (k.clone(), v.clone()))),
            other => {
                for pair in other.iterate()? {
                    let mut parts = pair.iterate()?;
                    let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                        return Err(EvalError::type_error(
                            "dict() sequence elements must be pairs",
                        ));
                    };
                    entries.insert(key.to_text().into_owned(), value);
                }
            }
        }
    }
    entries.extend(kwargs);
    Ok(Value::map(entries))
}
