//! Expression AST
//!
//! The single expression representation shared by every dialect. Path,
//! string and native expressions all translate into this tree, and the
//! generated program evaluates it directly.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOperator::Not => "not ",
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
    And,
    Or,
}

impl BinaryOperator {
    pub fn from_operator(op: &str) -> Option<Self> {
        Some(match op {
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Sub,
            "*" => BinaryOperator::Mul,
            "/" => BinaryOperator::Div,
            "//" => BinaryOperator::FloorDiv,
            "%" => BinaryOperator::Mod,
            "==" => BinaryOperator::Eq,
            "!=" => BinaryOperator::NotEq,
            "<" => BinaryOperator::Lt,
            "<=" => BinaryOperator::LtE,
            ">" => BinaryOperator::Gt,
            ">=" => BinaryOperator::GtE,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::FloorDiv => "//",
            BinaryOperator::Mod => "%",
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtE => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtE => ">=",
            BinaryOperator::In => "in",
            BinaryOperator::NotIn => "not in",
            BinaryOperator::Is => "is",
            BinaryOperator::IsNot => "is not",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    /// Variable lookup.
    Name(String),
    /// Compiler-allocated temporary.
    Temp(usize),
    Attribute {
        receiver: Box<Expr>,
        name: String,
    },
    Subscript {
        receiver: Box<Expr>,
        key: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    Unary {
        operator: UnaryOperator,
        expr: Box<Expr>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        true_exp: Box<Expr>,
        false_exp: Box<Expr>,
    },
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    /// Text concatenation; each part is coerced to text.
    Concat(Vec<Expr>),
    /// Invocation of a runtime helper bound in the program's symbol table.
    Helper {
        symbol: String,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    /// Reference to a runtime helper object itself.
    Symbol(String),
}

impl Expr {
    pub fn none() -> Self {
        Expr::Literal(Literal::None)
    }

    pub fn str(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::Str(value.into()))
    }

    pub fn bool(value: bool) -> Self {
        Expr::Literal(Literal::Bool(value))
    }

    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    pub fn not(expr: Expr) -> Self {
        Expr::Unary {
            operator: UnaryOperator::Not,
            expr: Box::new(expr),
        }
    }

    pub fn binary(operator: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn item(receiver: Expr, key: Expr) -> Self {
        Expr::Subscript {
            receiver: Box::new(receiver),
            key: Box::new(key),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>, kwargs: Vec<(String, Expr)>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
            kwargs,
        }
    }

    pub fn helper(symbol: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Helper {
            symbol: symbol.into(),
            args,
            kwargs: Vec::new(),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::serializer::serialize(self))
    }
}
