//! Error Types
//!
//! Compile-time, evaluation and render errors for the page template compiler.

use thiserror::Error;

use crate::parse_util::ParseLocation;

/// Errors raised while turning a template body into a program.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("Unable to parse template: {message}")]
    ParseError { message: String },

    #[error("Root element is in an unknown namespace: {namespace}")]
    UnknownNamespace { namespace: String },

    #[error("{message}{}", context_suffix(.attribute, .element, .location))]
    Syntax {
        message: String,
        attribute: Option<String>,
        element: Option<String>,
        location: Option<ParseLocation>,
    },

    #[error("Conflicting directives `{first}` and `{second}` on element <{element}>")]
    ConflictingDirectives {
        element: String,
        first: String,
        second: String,
    },

    #[error("Unknown directive `{attribute}` on element <{element}>")]
    UnknownDirective { element: String, attribute: String },

    #[error("Macro not found: {0}")]
    MacroNotFound(String),

    #[error("Internal compiler error: {0}")]
    Internal(String),
}

fn context_suffix(
    attribute: &Option<String>,
    element: &Option<String>,
    location: &Option<ParseLocation>,
) -> String {
    let mut suffix = String::new();
    if let Some(attribute) = attribute {
        suffix.push_str(&format!(" (in attribute `{}`", attribute));
        if let Some(element) = element {
            suffix.push_str(&format!(" of <{}>", element));
        }
        suffix.push(')');
    } else if let Some(element) = element {
        suffix.push_str(&format!(" (in element <{}>)", element));
    }
    if let Some(location) = location {
        suffix.push_str(&format!(" at {}", location));
    }
    suffix
}

impl CompilerError {
    pub fn syntax(message: impl Into<String>) -> Self {
        CompilerError::Syntax {
            message: message.into(),
            attribute: None,
            element: None,
            location: None,
        }
    }

    /// Attach the attribute and element a syntax error was found in, unless
    /// a more specific context is already present.
    pub fn in_context(
        self,
        attribute: Option<&str>,
        element: &str,
        location: Option<ParseLocation>,
    ) -> Self {
        match self {
            CompilerError::Syntax {
                message,
                attribute: None,
                element: None,
                location: None,
            } => CompilerError::Syntax {
                message,
                attribute: attribute.map(str::to_string),
                element: Some(element.to_string()),
                location,
            },
            other => other,
        }
    }
}

/// Errors raised by evaluating expressions against user data.
///
/// These are the only errors a fallback chain (`a | b`) will swallow.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("name '{0}' is not defined")]
    Name(String),

    #[error("'{type_name}' object has no attribute '{attribute}'")]
    Attribute { type_name: String, attribute: String },

    #[error("key not found: {0}")]
    Key(String),

    #[error("index out of range: {0}")]
    Index(i64),

    #[error("{0}")]
    Type(String),

    #[error("division by zero")]
    ZeroDivision,

    #[error("overflow: {0}")]
    Overflow(String),

    #[error("cannot iterate over {0}")]
    NotIterable(String),

    #[error("content provider not found: {0}")]
    ProviderNotFound(String),

    #[error("content provider '{name}' failed: {source}")]
    Provider {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Host(#[from] anyhow::Error),

    #[error("nested template failed: {0}")]
    Template(Box<TemplateError>),
}

impl EvalError {
    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type(message.into())
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        EvalError::Overflow(message.into())
    }

    /// Whether an alternative may fall back past this error. Compile errors
    /// of nested templates never do.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EvalError::Template(err) => match err.as_ref() {
                TemplateError::Compile(_) => false,
                TemplateError::Render(err) => err.is_recoverable(),
                TemplateError::Io { .. } => true,
            },
            _ => true,
        }
    }
}

/// Errors raised while executing a compiled program.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("{source}\n - while evaluating `{directive}` (line {line} of the program listing)")]
    Annotated {
        directive: String,
        line: usize,
        #[source]
        source: Box<RenderError>,
    },

    #[error("Internal render error: {0}")]
    Internal(String),
}

impl RenderError {
    /// The evaluation error underneath any debug annotations.
    pub fn evaluation(&self) -> Option<&EvalError> {
        match self {
            RenderError::Eval(err) => Some(err),
            RenderError::Annotated { source, .. } => source.evaluation(),
            RenderError::Internal(_) => None,
        }
    }

    /// True for evaluation errors an alternative may fall back past.
    pub fn is_recoverable(&self) -> bool {
        self.evaluation().map_or(false, EvalError::is_recoverable)
    }

    pub fn is_annotated(&self) -> bool {
        matches!(self, RenderError::Annotated { .. })
    }
}

/// Errors surfaced by the template façade.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Compile(#[from] CompilerError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<EvalError> for TemplateError {
    fn from(err: EvalError) -> Self {
        TemplateError::Render(RenderError::Eval(err))
    }
}

pub type Result<T, E = CompilerError> = std::result::Result<T, E>;
