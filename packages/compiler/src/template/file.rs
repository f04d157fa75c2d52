//! File-backed templates.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use super::environment::Environment;
use super::page_template::PageTemplate;
use crate::error::{EvalError, TemplateError};
use crate::runtime::{IncludeResolver, Params, Value};

#[derive(Debug)]
struct Loaded {
    mtime: Option<SystemTime>,
    template: PageTemplate,
}

/// A template read from disk on first use. With auto-reload on (the
/// default in debug mode) it is re-read whenever the file's modification
/// time changes.
#[derive(Debug)]
pub struct PageTemplateFile {
    path: PathBuf,
    env: Arc<Environment>,
    text: bool,
    auto_reload: bool,
    loaded: RwLock<Option<Loaded>>,
}

impl PageTemplateFile {
    pub fn new(path: impl Into<PathBuf>, env: Arc<Environment>) -> Self {
        let auto_reload = env.config.debug();
        PageTemplateFile {
            path: path.into(),
            env,
            text: false,
            auto_reload,
            loaded: RwLock::new(None),
        }
    }

    /// A plain-text file template.
    pub fn text(path: impl Into<PathBuf>, env: Arc<Environment>) -> Self {
        PageTemplateFile {
            text: true,
            ..PageTemplateFile::new(path, env)
        }
    }

    pub fn with_auto_reload(mut self, auto_reload: bool) -> Self {
        self.auto_reload = auto_reload;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TemplateError {
        TemplateError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// The current template, reading the file when it was never read or,
    /// with auto-reload, when it changed since.
    pub fn template(&self) -> Result<PageTemplate, TemplateError> {
        let mtime = if self.auto_reload {
            fs::metadata(&self.path)
                .and_then(|metadata| metadata.modified())
                .ok()
        } else {
            None
        };

        {
            let loaded = self.loaded.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(loaded) = loaded.as_ref() {
                if !self.auto_reload || loaded.mtime == mtime {
                    return Ok(loaded.template.clone());
                }
                log::debug!("reloading {}", self.path.display());
            }
        }

        let body = fs::read_to_string(&self.path).map_err(|err| self.io_error(err))?;
        let directory = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let include: Arc<dyn IncludeResolver> = Arc::new(FileIncludeResolver {
            directory,
            env: Arc::clone(&self.env),
        });
        let template = PageTemplate::build(
            &body,
            self.text,
            Arc::clone(&self.env),
            Some(self.path.clone()),
            Some(include),
        )?;
        log::debug!("loaded {}", self.path.display());

        *self.loaded.write().unwrap_or_else(PoisonError::into_inner) = Some(Loaded {
            mtime,
            template: template.clone(),
        });
        Ok(template)
    }

    pub fn render(&self, params: Params) -> Result<String, TemplateError> {
        self.template()?.render(params)
    }

    pub fn render_macro(&self, name: &str, params: Params) -> Result<String, TemplateError> {
        self.template()?.render_macro(name, params)
    }

    pub fn macros(&self) -> Result<Value, TemplateError> {
        Ok(self.template()?.macros())
    }

    pub fn listing(
        &self,
        macro_name: Option<&str>,
        parameters: &[&str],
    ) -> Result<String, TemplateError> {
        self.template()?.listing(macro_name, parameters)
    }
}

/// Renders `xi:include` targets relative to the including file.
#[derive(Debug)]
struct FileIncludeResolver {
    directory: PathBuf,
    env: Arc<Environment>,
}

impl IncludeResolver for FileIncludeResolver {
    fn include(&self, href: &str, as_text: bool, context: Params) -> Result<Value, EvalError> {
        let path = self.directory.join(href);
        log::debug!("including {}", path.display());
        if as_text {
            return fs::read_to_string(&path).map(Value::str).map_err(|source| {
                EvalError::Template(Box::new(TemplateError::Io {
                    path: path.display().to_string(),
                    source,
                }))
            });
        }
        PageTemplateFile::new(path, Arc::clone(&self.env))
            .render(context)
            .map(Value::markup)
            .map_err(|err| EvalError::Template(Box::new(err)))
    }
}
