//! Template Module
//!
//! The public façade: the shared environment, string and file templates,
//! their program caches and macro access.

pub mod environment;
pub mod file;
pub mod filecache;
pub mod macros;
pub mod page_template;

pub use environment::Environment;
pub use file::PageTemplateFile;
pub use macros::{MacroRef, Macros};
pub use page_template::{CacheKey, PageTemplate};
