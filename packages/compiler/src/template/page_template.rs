//! Page Templates
//!
//! A parsed template body plus the programs compiled from it. A program is
//! compiled on first use for each combination of macro and parameter names
//! and shared by every later render with the same signature.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use super::environment::Environment;
use super::filecache;
use super::macros::Macros;
use crate::error::{CompilerError, TemplateError};
use crate::ml_parser::{Document, Parser};
use crate::output::Program;
use crate::runtime::{HostObject, IncludeResolver, Params, Runtime, Value};
use crate::translation::{compile, find_macro, macro_names};

/// Signature a compiled program is cached under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub macro_name: Option<String>,
    /// Sorted and deduplicated.
    pub parameters: Vec<String>,
}

impl CacheKey {
    pub fn new(macro_name: Option<&str>, mut parameters: Vec<String>) -> Self {
        parameters.sort();
        parameters.dedup();
        CacheKey {
            macro_name: macro_name.map(str::to_string),
            parameters,
        }
    }
}

struct Inner {
    document: Document,
    digest: u64,
    env: Arc<Environment>,
    /// Source file, for listing dumps and the disk cache.
    origin: Option<PathBuf>,
    include: Option<Arc<dyn IncludeResolver>>,
    cache: RwLock<HashMap<CacheKey, Arc<Program>>>,
}

/// A template compiled from a string. Cloning is cheap and clones share
/// the program cache.
#[derive(Clone)]
pub struct PageTemplate {
    inner: Arc<Inner>,
}

impl PageTemplate {
    /// Parse an XML template body.
    pub fn new(body: &str, env: Arc<Environment>) -> Result<Self, TemplateError> {
        PageTemplate::build(body, false, env, None, None)
    }

    /// A plain-text template: only `${...}` interpolation applies and
    /// nothing is escaped.
    pub fn from_text(body: &str, env: Arc<Environment>) -> Self {
        let document = Parser::new().parse_text(body);
        PageTemplate::from_document(document, digest(body), env, None, None)
    }

    /// A template read from `origin`, rendering includes through `include`.
    pub(crate) fn build(
        body: &str,
        text: bool,
        env: Arc<Environment>,
        origin: Option<PathBuf>,
        include: Option<Arc<dyn IncludeResolver>>,
    ) -> Result<Self, TemplateError> {
        let parser = Parser::new();
        let document = if text {
            parser.parse_text(body)
        } else {
            parser.parse(body)?
        };
        Ok(PageTemplate::from_document(
            document,
            digest(body),
            env,
            origin,
            include,
        ))
    }

    fn from_document(
        document: Document,
        digest: u64,
        env: Arc<Environment>,
        origin: Option<PathBuf>,
        include: Option<Arc<dyn IncludeResolver>>,
    ) -> Self {
        PageTemplate {
            inner: Arc::new(Inner {
                document,
                digest,
                env,
                origin,
                include,
                cache: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn env(&self) -> &Arc<Environment> {
        &self.inner.env
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn render(&self, params: Params) -> Result<String, TemplateError> {
        self.render_program(None, params)
    }

    /// Render one macro of this template. Fails with `MacroNotFound` when
    /// no element defines it.
    pub fn render_macro(&self, name: &str, params: Params) -> Result<String, TemplateError> {
        self.render_program(Some(name), params)
    }

    fn render_program(
        &self,
        macro_name: Option<&str>,
        params: Params,
    ) -> Result<String, TemplateError> {
        let program = self.program(macro_name, params.keys().cloned().collect())?;
        let mut runtime = Runtime::new(program, Arc::clone(&self.inner.env));
        if let Some(include) = &self.inner.include {
            runtime = runtime.with_include(Arc::clone(include));
        }
        Ok(runtime.render(params)?)
    }

    /// Names of the macros this template defines.
    pub fn macro_names(&self) -> Vec<String> {
        macro_names(&self.inner.document)
    }

    pub fn has_macro(&self, name: &str) -> bool {
        find_macro(&self.inner.document.root, name).is_some()
    }

    /// The macros as a value templates can traverse, e.g. passed in as
    /// `layout` and used as `metal:use-macro="layout/main"`.
    pub fn macros(&self) -> Value {
        Value::object(Macros::new(self.clone()))
    }

    /// The pseudo-source of the program for `macro_name` and `parameters`.
    pub fn listing(
        &self,
        macro_name: Option<&str>,
        parameters: &[&str],
    ) -> Result<String, TemplateError> {
        let parameters = parameters.iter().map(|name| name.to_string()).collect();
        Ok(self.program(macro_name, parameters)?.source())
    }

    /// The compiled program for a signature, from the in-memory cache, the
    /// disk cache or a fresh compile. Debug mode always compiles.
    pub fn program(
        &self,
        macro_name: Option<&str>,
        parameters: Vec<String>,
    ) -> Result<Arc<Program>, CompilerError> {
        let inner = &self.inner;
        let config = &inner.env.config;
        let key = CacheKey::new(macro_name, parameters);

        if !config.debug() {
            let cache = inner.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(program) = cache.get(&key) {
                log::debug!("program cache hit for {:?}", key);
                return Ok(Arc::clone(program));
            }
        }

        let disk = inner.origin.as_deref().filter(|_| config.disk_cache());
        let cached = disk.and_then(|path| {
            filecache::load(path, &config.cache_extension, inner.digest, &key)
        });
        let program = match cached {
            Some(program) => Arc::new(program),
            None => {
                log::debug!("compiling program for {:?}", key);
                let program = compile(
                    &inner.document,
                    key.macro_name.as_deref(),
                    &key.parameters,
                    &inner.env.translators,
                    &config.default_expression,
                )?;
                if let Some(path) = disk {
                    filecache::store(path, &config.cache_extension, inner.digest, &key, &program);
                }
                Arc::new(program)
            }
        };

        if config.debug() {
            if let Some(path) = &inner.origin {
                filecache::dump_listing(path, &program);
            }
        } else {
            inner
                .cache
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, Arc::clone(&program));
        }
        Ok(program)
    }
}

fn digest(body: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    hasher.finish()
}

impl fmt::Debug for PageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTemplate")
            .field("root", &self.inner.document.root.name.qualified())
            .field("origin", &self.inner.origin)
            .finish()
    }
}

impl HostObject for PageTemplate {
    fn type_name(&self) -> &str {
        "PageTemplate"
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        match name {
            "macros" => Some(self.macros()),
            _ => None,
        }
    }
}
