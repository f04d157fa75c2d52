/**
 * Expression Parser Module
 *
 * The native expression dialect and the expression AST every dialect
 * compiles to.
 */
pub mod ast;
pub mod lexer;
pub mod parser;
pub mod serializer;

pub use ast::*;
pub use lexer::Lexer;
pub use parser::Parser;
pub use serializer::serialize;
