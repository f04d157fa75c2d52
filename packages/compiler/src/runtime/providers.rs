//! Content Providers
//!
//! Named renderable components looked up by `provider:` expressions.

use std::collections::HashMap;
use std::sync::Arc;

use super::value::{Params, Value};
use crate::error::EvalError;

pub trait ContentProvider: Send + Sync {
    /// Render the provider's markup. Failures are the provider's own and are
    /// reported separately from a missing provider.
    fn render(&self, context: &Params) -> anyhow::Result<String>;
}

impl<F> ContentProvider for F
where
    F: Fn(&Params) -> anyhow::Result<String> + Send + Sync,
{
    fn render(&self, context: &Params) -> anyhow::Result<String> {
        self(context)
    }
}

pub trait ContentProviderRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Arc<dyn ContentProvider>>;
}

#[derive(Default, Clone)]
pub struct ProviderMap {
    providers: HashMap<String, Arc<dyn ContentProvider>>,
}

impl ProviderMap {
    pub fn new() -> Self {
        ProviderMap::default()
    }

    pub fn register(&mut self, name: impl Into<String>, provider: impl ContentProvider + 'static) {
        self.providers.insert(name.into(), Arc::new(provider));
    }
}

impl ContentProviderRegistry for ProviderMap {
    fn lookup(&self, name: &str) -> Option<Arc<dyn ContentProvider>> {
        self.providers.get(name).cloned()
    }
}

/// Look up and render `name`, returning markup.
pub fn render_provider(
    registry: Option<&dyn ContentProviderRegistry>,
    name: &str,
    context: &Params,
) -> Result<Value, EvalError> {
    let provider = registry
        .and_then(|registry| registry.lookup(name))
        .ok_or_else(|| EvalError::ProviderNotFound(name.to_string()))?;
    provider
        .render(context)
        .map(Value::markup)
        .map_err(|source| EvalError::Provider {
            name: name.to_string(),
            source,
        })
}
