//! Iteration State
//!
//! Per-iteration metadata exposed to templates as `repeat/<name>/...`.

use indexmap::IndexMap;
use std::sync::Arc;

use super::value::{HostObject, Value};

/// Immutable snapshot of one loop step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatItem {
    pub index: usize,
    /// Total length, when the iterable reports one.
    pub length: Option<usize>,
}

impl RepeatItem {
    pub fn new(index: usize, length: Option<usize>) -> Self {
        RepeatItem { index, length }
    }

    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn even(&self) -> bool {
        self.index % 2 == 0
    }

    pub fn odd(&self) -> bool {
        !self.even()
    }

    pub fn start(&self) -> bool {
        self.index == 0
    }

    /// `None` when the length is unknown.
    pub fn end(&self) -> Option<bool> {
        self.length.map(|length| self.index + 1 == length)
    }

    pub fn parity(&self) -> &'static str {
        if self.odd() {
            "odd"
        } else {
            "even"
        }
    }

    pub fn letter(&self) -> String {
        to_letters(self.index)
    }

    pub fn roman(&self) -> String {
        to_roman(self.number())
    }
}

fn to_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'a' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn to_roman(mut number: usize) -> String {
    const NUMERALS: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut result = String::new();
    for (value, numeral) in NUMERALS {
        while number >= value {
            result.push_str(numeral);
            number -= value;
        }
    }
    result
}

impl HostObject for RepeatItem {
    fn type_name(&self) -> &str {
        "RepeatItem"
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        Some(match name {
            "index" => Value::Int(self.index as i64),
            "number" => Value::Int(self.number() as i64),
            "even" => Value::Bool(self.even()),
            "odd" => Value::Bool(self.odd()),
            "start" => Value::Bool(self.start()),
            "end" => self.end().map(Value::Bool).unwrap_or(Value::None),
            "length" => self
                .length
                .map(|length| Value::Int(length as i64))
                .unwrap_or(Value::None),
            "parity" => Value::str(self.parity()),
            "letter" => Value::str(self.letter()),
            "Letter" => Value::str(self.letter().to_uppercase()),
            "roman" => Value::str(self.roman()),
            "Roman" => Value::str(self.roman().to_uppercase()),
            _ => return None,
        })
    }

    fn get_item(&self, key: &Value) -> Option<Value> {
        key.as_str().and_then(|name| self.get_attr(name))
    }
}

/// The `repeat` mapping for one render. Entries are replaced per step, and
/// loops restore whatever entry they shadowed when they finish.
#[derive(Debug, Clone, Default)]
pub struct RepeatDict {
    items: IndexMap<String, RepeatItem>,
}

impl RepeatDict {
    pub fn new() -> Self {
        RepeatDict::default()
    }

    pub fn get(&self, key: &str) -> Option<RepeatItem> {
        self.items.get(key).copied()
    }

    /// Set the entry for `key`, returning the one it replaces.
    pub fn set(&mut self, key: &str, item: RepeatItem) -> Option<RepeatItem> {
        self.items.insert(key.to_string(), item)
    }

    pub fn reset(&mut self, key: &str, previous: Option<RepeatItem>) {
        match previous {
            Some(item) => {
                self.items.insert(key.to_string(), item);
            }
            None => {
                self.items.shift_remove(key);
            }
        }
    }

    /// A read-only view for expression evaluation.
    pub fn snapshot(&self) -> Value {
        Value::Object(Arc::new(RepeatView {
            items: self.items.clone(),
        }))
    }
}

#[derive(Debug)]
struct RepeatView {
    items: IndexMap<String, RepeatItem>,
}

impl HostObject for RepeatView {
    fn type_name(&self) -> &str {
        "repeatdict"
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        self.items.get(name).map(|item| Value::object(*item))
    }

    fn get_item(&self, key: &Value) -> Option<Value> {
        key.as_str().and_then(|name| self.get_attr(name))
    }

    fn len(&self) -> Option<usize> {
        Some(self.items.len())
    }

    fn is_true(&self) -> bool {
        !self.items.is_empty()
    }
}
