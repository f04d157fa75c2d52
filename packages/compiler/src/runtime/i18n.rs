//! Message Translation
//!
//! The translation service contract, an in-memory catalog and the
//! interpolation-only fallback used when translation is disabled.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

use super::value::Value;

static INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_\-\.]*)\}").unwrap());

pub trait TranslationService: Send + Sync {
    /// Look up `msgid` in `domain` for `target_language`. `None` signals a
    /// catalog miss.
    fn translate(
        &self,
        msgid: &str,
        domain: Option<&str>,
        mapping: Option<&IndexMap<String, Value>>,
        target_language: Option<&str>,
    ) -> Option<String>;

    /// Choose a language when the caller supplied none.
    fn negotiate(&self) -> Option<String> {
        None
    }
}

/// Substitute `${name}` placeholders from `mapping`. Unknown names are left
/// in place.
pub fn interpolate(text: &str, mapping: Option<&IndexMap<String, Value>>) -> String {
    let Some(mapping) = mapping else {
        return text.to_string();
    };
    INTERPOLATION
        .replace_all(text, |captures: &regex::Captures<'_>| {
            match mapping.get(&captures[1]) {
                Some(value) => value.to_text().into_owned(),
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}

/// Translation without a catalog: the default (or the msgid) with the
/// mapping interpolated. A default that is not text comes back unchanged.
pub fn fast_translate(
    msgid: &Value,
    mapping: Option<&IndexMap<String, Value>>,
    default: &Value,
) -> Value {
    match default {
        Value::None => match msgid {
            Value::Str(text) => Value::str(interpolate(text, mapping)),
            other => other.clone(),
        },
        Value::Str(text) => Value::str(interpolate(text, mapping)),
        other => other.clone(),
    }
}

/// Collapse runs of whitespace and trim, as message ids are keyed.
pub fn normalize_msgid(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    default_language: Option<String>,
    /// domain → language → msgid → translation
    #[serde(default)]
    domains: HashMap<String, HashMap<String, HashMap<String, String>>>,
}

/// An in-memory message catalog.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    default_language: Option<String>,
    messages: HashMap<(String, String), HashMap<String, String>>,
}

pub const DEFAULT_DOMAIN: &str = "default";

impl MessageCatalog {
    pub fn new() -> Self {
        MessageCatalog::default()
    }

    /// Load a catalog of the form
    /// `{"default_language": "de", "domains": {"default": {"de": {"Hello": "Hallo"}}}}`.
    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        let file: CatalogFile = serde_json::from_str(source)?;
        let mut catalog = MessageCatalog {
            default_language: file.default_language,
            ..MessageCatalog::default()
        };
        for (domain, languages) in file.domains {
            for (language, messages) in languages {
                catalog
                    .messages
                    .entry((domain.clone(), language))
                    .or_default()
                    .extend(messages);
            }
        }
        Ok(catalog)
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = Some(language.into());
        self
    }

    pub fn add(
        &mut self,
        domain: &str,
        language: &str,
        msgid: impl Into<String>,
        translation: impl Into<String>,
    ) {
        self.messages
            .entry((domain.to_string(), language.to_string()))
            .or_default()
            .insert(msgid.into(), translation.into());
    }
}

impl TranslationService for MessageCatalog {
    fn translate(
        &self,
        msgid: &str,
        domain: Option<&str>,
        mapping: Option<&IndexMap<String, Value>>,
        target_language: Option<&str>,
    ) -> Option<String> {
        let language = target_language.or(self.default_language.as_deref())?;
        let key = (
            domain.unwrap_or(DEFAULT_DOMAIN).to_string(),
            language.to_string(),
        );
        let translation = self.messages.get(&key)?.get(msgid)?;
        Some(interpolate(translation, mapping))
    }

    fn negotiate(&self) -> Option<String> {
        self.default_language.clone()
    }
}
