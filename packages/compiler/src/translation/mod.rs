//! Translation Module
//!
//! Compiles the element tree into a program: directive tables per element,
//! clause lists per directive and the entry point that drives them.

pub mod compiler;
pub mod directives;
pub mod i18n;
pub mod matching;
pub mod node;

pub use compiler::{compile, find_macro, macro_names};
pub use directives::{Dialect, Directive, DirectiveTable};
pub use i18n::create_msgid;
pub use matching::{match_templates, MatchTemplate};
