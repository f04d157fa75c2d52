//! Runtime Module
//!
//! Everything a compiled program needs while it renders: values, lookups,
//! builtins, escaping, iteration state, translation and the executor.

pub mod builtins;
pub mod escape;
pub mod eval;
pub mod executor;
pub mod i18n;
pub mod providers;
pub mod repeat;
pub mod select;
pub mod traverse;
pub mod value;

pub use executor::{IncludeResolver, Marker, Runtime};
pub use i18n::{MessageCatalog, TranslationService};
pub use providers::{ContentProvider, ContentProviderRegistry, ProviderMap};
pub use repeat::RepeatItem;
pub use select::Selection;
pub use value::{params_from_json, Callable, HostObject, Kwargs, Params, Value};
