//! Compiler Configuration
//!
//! Process-wide switches read from the environment, and the reserved
//! symbol names threaded through generated programs.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Values accepted as "true" for boolean environment switches.
pub const TRUEVALS: &[&str] = &["y", "yes", "t", "true", "on", "1"];

pub const DEBUG_ENV: &str = "PAGETEMPLATE_DEBUG";
pub const DISABLE_I18N_ENV: &str = "PAGETEMPLATE_DISABLE_I18N";
pub const DISK_CACHE_ENV: &str = "PAGETEMPLATE_DISK_CACHE";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ConfigFlags: u8 {
        /// Dump program listings, annotate render errors, reload files and
        /// skip the compiled-program cache.
        const DEBUG = 1 << 0;
        /// Use the interpolation-only translation stub.
        const DISABLE_I18N = 1 << 1;
        /// Persist compiled programs next to file templates.
        const DISK_CACHE = 1 << 2;
    }
}

fn default_expression() -> String {
    "path".to_string()
}

fn default_cache_extension() -> String {
    "cache".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompilerConfig {
    #[serde(default)]
    pub flags: ConfigFlags,
    /// Expression dialect used when an expression carries no pragma.
    #[serde(default = "default_expression")]
    pub default_expression: String,
    #[serde(default = "default_cache_extension")]
    pub cache_extension: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            flags: ConfigFlags::empty(),
            default_expression: default_expression(),
            cache_extension: default_cache_extension(),
        }
    }
}

impl CompilerConfig {
    /// Read the switches from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the switches through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut flags = ConfigFlags::empty();
        for (key, flag) in [
            (DEBUG_ENV, ConfigFlags::DEBUG),
            (DISABLE_I18N_ENV, ConfigFlags::DISABLE_I18N),
            (DISK_CACHE_ENV, ConfigFlags::DISK_CACHE),
        ] {
            if lookup(key).map(|value| is_true(&value)).unwrap_or(false) {
                flags |= flag;
            }
        }
        log::debug!("compiler configuration flags: {:?}", flags);
        CompilerConfig {
            flags,
            ..CompilerConfig::default()
        }
    }

    pub fn with_flags(mut self, flags: ConfigFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_default_expression(mut self, name: impl Into<String>) -> Self {
        self.default_expression = name.into();
        self
    }

    pub fn debug(&self) -> bool {
        self.flags.contains(ConfigFlags::DEBUG)
    }

    pub fn disable_i18n(&self) -> bool {
        self.flags.contains(ConfigFlags::DISABLE_I18N)
    }

    pub fn disk_cache(&self) -> bool {
        self.flags.contains(ConfigFlags::DISK_CACHE)
    }
}

pub fn is_true(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    TRUEVALS.contains(&value.as_str())
}

/// Reserved names used by generated programs.
///
/// Template variables may not start with an underscore, so none of the
/// internal names can collide with user definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbols {
    pub out: &'static str,
    pub write: &'static str,
    pub scope: &'static str,
    pub tmp: &'static str,
    pub slot: &'static str,
    pub mapping: &'static str,
    pub result: &'static str,
    pub marker: &'static str,
    pub domain: &'static str,
    pub translate: &'static str,
    pub path: &'static str,
    pub exists: &'static str,
    pub provider: &'static str,
    pub include: &'static str,
    pub metal: &'static str,
    pub choose: &'static str,
    pub chosen: &'static str,
    pub matcher: &'static str,
    pub select: &'static str,
    pub repeat: &'static str,
    pub language: &'static str,
}

impl Default for Symbols {
    fn default() -> Self {
        Symbols {
            out: "_out",
            write: "_write",
            scope: "_scope",
            tmp: "_tmp",
            slot: "_slot_",
            mapping: "_mapping",
            result: "_result",
            marker: "_marker",
            domain: "_domain",
            translate: "_translate",
            path: "_path",
            exists: "_exists",
            provider: "_provider",
            include: "_include",
            metal: "_metal",
            choose: "_choose",
            chosen: "_chosen",
            matcher: "_match",
            select: "_select",
            repeat: "repeat",
            language: "target_language",
        }
    }
}

impl Symbols {
    /// Names bound in the outermost scope of every program besides the
    /// declared parameters.
    pub fn reserved(&self) -> [&'static str; 4] {
        [self.out, self.write, self.scope, self.domain]
    }

    pub fn slot_variable(&self, name: &str) -> String {
        format!("{}{}", self.slot, name)
    }

    /// The subject of the `py:choose` block numbered `id`.
    pub fn choose_subject(&self, id: usize) -> String {
        format!("{}{}", self.choose, id)
    }

    /// Set once a `py:when` of block `id` has matched.
    pub fn choose_flag(&self, id: usize) -> String {
        format!("{}{}", self.chosen, id)
    }

    pub fn match_function(&self, id: usize) -> String {
        format!("{}{}", self.matcher, id)
    }

    pub fn selector(&self, id: usize) -> String {
        format!("{}{}", self.select, id)
    }
}
