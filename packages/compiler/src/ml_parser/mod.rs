//! ML (Markup Language) Parser Module
//!
//! Parses template bodies into the element tree the compiler walks.

pub mod ast;
pub mod entities;
pub mod namespaces;
pub mod parser;
pub mod pattern;
pub mod serializer;

pub use ast::*;
pub use namespaces::*;
pub use parser::Parser;
pub use pattern::Pattern;
pub use serializer::{content_markup, to_markup};
