#![deny(clippy::all)]

/**
 * Page Template Compiler
 *
 * Compiles TAL/METAL/i18n page templates into programs and renders them
 * against host data.
 */

// Core modules
pub mod chars;
pub mod config;
pub mod error;
pub mod parse_util;

// Parsers
pub mod expression_parser;
pub mod ml_parser;
pub mod tales;

// Compilation
pub mod output;
pub mod translation;

// Rendering
pub mod runtime;
pub mod template;

// Re-exports
pub use config::{CompilerConfig, ConfigFlags, Symbols};
pub use error::{CompilerError, EvalError, RenderError, TemplateError};
pub use output::{Program, ProgramKind};
pub use runtime::{HostObject, MessageCatalog, Params, TranslationService, Value};
pub use template::{Environment, PageTemplate, PageTemplateFile};

use std::sync::Arc;

/// Render an XML template body once with JSON parameters, using the
/// environment configured from the process environment.
pub fn render_template(body: &str, params: serde_json::Value) -> Result<String, TemplateError> {
    let env = Arc::new(Environment::from_env());
    PageTemplate::new(body, env)?.render(runtime::value::params_from_json(params))
}

/// The program listing of a template body compiled for `parameters`.
pub fn compile_listing(body: &str, parameters: &[&str]) -> Result<String, TemplateError> {
    let env = Arc::new(Environment::from_env());
    PageTemplate::new(body, env)?.listing(None, parameters)
}
