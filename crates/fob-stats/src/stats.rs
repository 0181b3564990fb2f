//! Compiler-wide statistics read at build completion.
//!
//! Every field is best-effort. Absence is not an error; each field has a
//! single accessor that applies its default-on-absence policy.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Elapsed time reported when the host has none.
pub const UNKNOWN_TIME: i64 = -1;

/// Flags the host attached to one module of the build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStats {
    /// The module was served from cache.
    #[serde(default)]
    pub cached: Option<bool>,

    /// The module was (re)processed in this build.
    #[serde(default)]
    pub built: Option<bool>,
}

impl ModuleStats {
    pub fn cached() -> Self {
        Self {
            cached: Some(true),
            built: None,
        }
    }

    pub fn built() -> Self {
        Self {
            cached: None,
            built: Some(true),
        }
    }

    /// A module the host attached no flags to.
    pub fn unflagged() -> Self {
        Self::default()
    }

    pub fn is_cached(&self) -> bool {
        self.cached.unwrap_or(false)
    }

    pub fn is_built(&self) -> bool {
        self.built.unwrap_or(false)
    }
}

/// Cached/rebuilt counters derived from the module list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleCounts {
    pub cached: u64,
    pub rebuilt: u64,
}

impl ModuleCounts {
    /// Count modules per flag. An absent list counts as zero of each.
    ///
    /// Each counter looks only at its own flag; an unflagged module
    /// contributes to neither.
    pub fn from_modules(modules: Option<&[ModuleStats]>) -> Self {
        let Some(modules) = modules else {
            return Self::default();
        };

        modules.iter().fold(Self::default(), |mut counts, module| {
            if module.is_cached() {
                counts.cached += 1;
            }
            if module.is_built() {
                counts.rebuilt += 1;
            }
            counts
        })
    }
}

/// Statistics the host reports once the build is final.
///
/// Deserializes from the usual bundler stats document shape
/// (`hash`, `version`, `time`, `modules[].cached`, `modules[].built`);
/// unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationStats {
    #[serde(default)]
    pub hash: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    /// Elapsed build time in milliseconds.
    #[serde(default)]
    pub time: Option<i64>,

    #[serde(default)]
    pub modules: Option<Vec<ModuleStats>>,
}

impl CompilationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn time(mut self, millis: i64) -> Self {
        self.time = Some(millis);
        self
    }

    pub fn modules(mut self, modules: impl IntoIterator<Item = ModuleStats>) -> Self {
        self.modules = Some(modules.into_iter().collect());
        self
    }

    /// Parse a stats JSON document.
    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(Error::InvalidStats)
    }

    /// Elapsed time, or [`UNKNOWN_TIME`].
    pub fn time_or_unknown(&self) -> i64 {
        self.time.unwrap_or(UNKNOWN_TIME)
    }

    pub fn module_counts(&self) -> ModuleCounts {
        ModuleCounts::from_modules(self.modules.as_deref())
    }
}
