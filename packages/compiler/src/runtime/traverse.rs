//! Attribute, item and path lookup over runtime values.

use super::value::{Kwargs, Value};
use crate::error::EvalError;

/// `receiver.name` in native expressions.
pub fn lookup_attr(receiver: &Value, name: &str) -> Result<Value, EvalError> {
    match receiver {
        Value::Object(object) => {
            if let Some(value) = object.get_attr(name) {
                return Ok(value);
            }
        }
        Value::Map(entries) => {
            if let Some(value) = entries.get(name) {
                return Ok(value.clone());
            }
        }
        _ => {}
    }
    bound_method(receiver, name).ok_or_else(|| no_attribute(receiver, name))
}

/// `receiver[key]`.
pub fn lookup_item(receiver: &Value, key: &Value) -> Result<Value, EvalError> {
    match receiver {
        Value::Map(entries) => {
            let name = key.to_text();
            entries
                .get(&*name)
                .cloned()
                .ok_or_else(|| EvalError::Key(key.repr()))
        }
        Value::List(items) => {
            let index = key
                .as_int()
                .ok_or_else(|| EvalError::type_error("list indices must be integers"))?;
            index_into(items, index)
                .cloned()
                .ok_or(EvalError::Index(index))
        }
        Value::Str(text) | Value::Markup(text) => {
            let index = key
                .as_int()
                .ok_or_else(|| EvalError::type_error("string indices must be integers"))?;
            let chars: Vec<char> = text.chars().collect();
            index_into(&chars, index)
                .map(|c| Value::str(c.to_string()))
                .ok_or(EvalError::Index(index))
        }
        Value::Object(object) => object
            .get_item(key)
            .ok_or_else(|| EvalError::Key(key.repr())),
        other => Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn index_into<T>(items: &[T], index: i64) -> Option<&T> {
    let resolved = if index < 0 {
        items.len() as i64 + index
    } else {
        index
    };
    usize::try_from(resolved).ok().and_then(|i| items.get(i))
}

/// One path segment: attribute, then mapping key, then list index, then the
/// host's traversal hook.
pub fn traverse_segment(base: &Value, segment: &str) -> Result<Value, EvalError> {
    match base {
        Value::Object(object) => {
            if let Some(value) = object.get_attr(segment) {
                return Ok(value);
            }
            if let Some(value) = object.get_item(&Value::str(segment)) {
                return Ok(value);
            }
            object.traverse(segment)
        }
        Value::Map(entries) => entries
            .get(segment)
            .cloned()
            .ok_or_else(|| EvalError::Key(format!("'{}'", segment))),
        Value::List(items) => match segment.parse::<i64>() {
            Ok(index) => index_into(items, index)
                .cloned()
                .ok_or(EvalError::Index(index)),
            Err(_) => Err(no_attribute(base, segment)),
        },
        other => bound_method(other, segment).ok_or_else(|| no_attribute(other, segment)),
    }
}

/// Walk `segments` from `base`, calling the result unless `nocall` is set.
pub fn traverse_path(base: Value, segments: &[Value], call: bool) -> Result<Value, EvalError> {
    let mut current = base;
    for segment in segments {
        let name = segment.to_text();
        current = traverse_segment(&current, &name)?;
    }
    if call {
        call_if_callable(current)
    } else {
        Ok(current)
    }
}

/// Path results are invoked with no arguments when they are plain functions.
pub fn call_if_callable(value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Callable(callable) => callable.call(Vec::new(), Kwargs::new()),
        other => Ok(other),
    }
}

/// Invoke `callee` with explicit arguments.
pub fn call_value(callee: &Value, args: Vec<Value>, kwargs: Kwargs) -> Result<Value, EvalError> {
    match callee {
        Value::Callable(callable) => callable.call(args, kwargs),
        Value::Object(object) => object.call(args, kwargs).unwrap_or_else(|| {
            Err(EvalError::type_error(format!(
                "'{}' object is not callable",
                object.type_name()
            )))
        }),
        other => Err(EvalError::type_error(format!(
            "'{}' object is not callable",
            other.type_name()
        ))),
    }
}

fn no_attribute(receiver: &Value, name: &str) -> EvalError {
    EvalError::Attribute {
        type_name: receiver.type_name().to_string(),
        attribute: name.to_string(),
    }
}

fn bound_method(receiver: &Value, name: &str) -> Option<Value> {
    match receiver {
        Value::Str(_) | Value::Markup(_) => string_method(receiver, name),
        Value::Map(_) => mapping_method(receiver, name),
        _ => None,
    }
}

fn string_method(receiver: &Value, name: &str) -> Option<Value> {
    let text = receiver.as_str()?.to_string();
    let method = name.to_string();
    match name {
        "upper" | "lower" | "strip" | "split" | "join" | "replace" | "startswith"
        | "endswith" => Some(Value::function(name, move |args, _| {
            string_call(&text, &method, &args)
        })),
        _ => None,
    }
}

fn string_call(text: &str, method: &str, args: &[Value]) -> Result<Value, EvalError> {
    let arg = |index: usize| -> Result<String, EvalError> {
        args.get(index)
            .map(|value| value.to_text().into_owned())
            .ok_or_else(|| EvalError::type_error(format!("{}() missing argument", method)))
    };
    Ok(match method {
        "upper" => Value::str(text.to_uppercase()),
        "lower" => Value::str(text.to_lowercase()),
        "strip" => Value::str(text.trim()),
        "split" => match args.first() {
            Some(separator) => Value::list(
                text.split(&*separator.to_text())
                    .map(Value::str)
                    .collect(),
            ),
            None => Value::list(text.split_whitespace().map(Value::str).collect()),
        },
        "join" => {
            let items = args
                .first()
                .ok_or_else(|| EvalError::type_error("join() missing argument"))?
                .iterate()?;
            Value::str(
                items
                    .map(|item| item.to_text().into_owned())
                    .collect::<Vec<_>>()
                    .join(text),
            )
        }
        "replace" => Value::str(text.replace(&arg(0)?, &arg(1)?)),
        "startswith" => Value::Bool(text.starts_with(&arg(0)?)),
        "endswith" => Value::Bool(text.ends_with(&arg(0)?)),
        _ => return Err(EvalError::type_error(format!("unknown method {}", method))),
    })
}

fn mapping_method(receiver: &Value, name: &str) -> Option<Value> {
    let Value::Map(entries) = receiver else {
        return None;
    };
    let entries = entries.clone();
    match name {
        "get" => Some(Value::function("get", move |args, _| {
            let key = args
                .first()
                .ok_or_else(|| EvalError::type_error("get() missing argument"))?;
            Ok(entries
                .get(&*key.to_text())
                .cloned()
                .unwrap_or_else(|| args.get(1).cloned().unwrap_or_default()))
        })),
        "keys" => Some(Value::function("keys", move |_, _| {
            Ok(Value::list(entries.keys().map(Value::str).collect()))
        })),
        "values" => Some(Value::function("values", move |_, _| {
            Ok(Value::list(entries.values().cloned().collect()))
        })),
        "items" => Some(Value::function("items", move |_, _| {
            Ok(Value::list(
                entries
                    .iter()
                    .map(|(key, value)| Value::list(vec![Value::str(key), value.clone()]))
                    .collect(),
            ))
        })),
        _ => None,
    }
}
