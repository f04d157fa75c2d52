/**
 * Expression Serializer
 *
 * Serializes the expression AST back to source form for program listings
 */
use super::ast::*;

/// Serialize AST to string
pub fn serialize(expr: &Expr) -> String {
    let mut visitor = SerializeExpressionVisitor;
    visitor.visit(expr)
}

/// Quote a string literal the way the native dialect reads it back.
pub fn quote(value: &str) -> String {
    let mut result = String::with_capacity(value.len() + 2);
    result.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => result.push_str("\\'"),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            other => result.push(other),
        }
    }
    result.push('\'');
    result
}

struct SerializeExpressionVisitor;

impl SerializeExpressionVisitor {
    fn visit(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(literal) => self.visit_literal(literal),
            Expr::Name(name) => name.clone(),
            Expr::Temp(index) => format!("_tmp{}", index),
            Expr::Attribute { receiver, name } => format!("{}.{}", self.visit(receiver), name),
            Expr::Subscript { receiver, key } => {
                format!("{}[{}]", self.visit(receiver), self.visit(key))
            }
            Expr::Call {
                callee,
                args,
                kwargs,
            } => format!("{}({})", self.visit(callee), self.visit_arguments(args, kwargs)),
            Expr::Unary { operator, expr } => format!("{}{}", operator, self.visit(expr)),
            Expr::Binary {
                operator,
                left,
                right,
            } => format!("({} {} {})", self.visit(left), operator, self.visit(right)),
            Expr::Conditional {
                condition,
                true_exp,
                false_exp,
            } => format!(
                "({} if {} else {})",
                self.visit(true_exp),
                self.visit(condition),
                self.visit(false_exp)
            ),
            Expr::List(items) => format!(
                "[{}]",
                items.iter().map(|item| self.visit(item)).collect::<Vec<_>>().join(", ")
            ),
            Expr::Dict(entries) => format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", self.visit(key), self.visit(value)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Expr::Concat(parts) => format!(
                "''.join(({}))",
                parts.iter().map(|part| self.visit(part)).collect::<Vec<_>>().join(", ")
            ),
            Expr::Helper {
                symbol,
                args,
                kwargs,
            } => format!("{}({})", symbol, self.visit_arguments(args, kwargs)),
            Expr::Symbol(symbol) => symbol.clone(),
        }
    }

    fn visit_literal(&mut self, literal: &Literal) -> String {
        match literal {
            Literal::None => "None".to_string(),
            Literal::Bool(true) => "True".to_string(),
            Literal::Bool(false) => "False".to_string(),
            Literal::Int(n) => n.to_string(),
            Literal::Float(n) => format!("{:?}", n),
            Literal::Str(s) => quote(s),
        }
    }

    fn visit_arguments(&mut self, args: &[Expr], kwargs: &[(String, Expr)]) -> String {
        let mut parts = Vec::with_capacity(args.len() + kwargs.len());
        for arg in args {
            parts.push(self.visit(arg));
        }
        for (name, value) in kwargs {
            parts.push(format!("{}={}", name, self.visit(value)));
        }
        parts.join(", ")
    }
}
