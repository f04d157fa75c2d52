//! Compilation and rendering environment shared by every template.

use std::fmt;
use std::sync::Arc;

use crate::config::{CompilerConfig, Symbols};
use crate::runtime::{ContentProviderRegistry, TranslationService};
use crate::tales::{ExpressionTranslator, TranslatorRegistry};

/// Configuration, reserved symbols, expression dialects and the optional
/// translation and content-provider services. Built once, then shared
/// through `Arc`.
pub struct Environment {
    pub config: CompilerConfig,
    pub symbols: Symbols,
    pub translators: TranslatorRegistry,
    translation_service: Option<Arc<dyn TranslationService>>,
    providers: Option<Arc<dyn ContentProviderRegistry>>,
}

impl Environment {
    pub fn new(config: CompilerConfig) -> Self {
        let symbols = Symbols::default();
        Environment {
            config,
            translators: TranslatorRegistry::new(symbols.clone()),
            symbols,
            translation_service: None,
            providers: None,
        }
    }

    /// An environment configured from the process environment.
    pub fn from_env() -> Self {
        Environment::new(CompilerConfig::from_env())
    }

    pub fn with_translation_service(mut self, service: Arc<dyn TranslationService>) -> Self {
        self.translation_service = Some(service);
        self
    }

    pub fn with_providers(mut self, providers: Arc<dyn ContentProviderRegistry>) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Register an additional expression dialect.
    pub fn with_translator<T: ExpressionTranslator + 'static>(mut self, translator: T) -> Self {
        self.translators.register(translator);
        self
    }

    pub fn translation_service(&self) -> Option<&dyn TranslationService> {
        self.translation_service.as_deref()
    }

    pub fn providers(&self) -> Option<&dyn ContentProviderRegistry> {
        self.providers.as_deref()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new(CompilerConfig::default())
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("config", &self.config)
            .field("translators", &self.translators)
            .field("translation_service", &self.translation_service.is_some())
            .field("providers", &self.providers.is_some())
            .finish()
    }
}
