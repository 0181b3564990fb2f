//! Build stats configuration.
//!
//! Sources are layered with figment. Priority: environment variables
//! (`FOB_STATS_*`) > config file (`fob-stats.toml`) > defaults.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::sink::{JsonLinesSink, NoopSink, SnapshotSink, TracingSink};
use crate::{Error, Result};

/// Conventional config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "fob-stats.toml";

/// Prefix for environment overrides, e.g. `FOB_STATS_IDENTIFIER`.
pub const ENV_PREFIX: &str = "FOB_STATS_";

/// Set by npm, yarn and pnpm to the name of the script being run.
pub const LIFECYCLE_EVENT_VAR: &str = "npm_lifecycle_event";

/// The package-manager script that started this process, if any.
pub fn lifecycle_event() -> Option<String> {
    std::env::var(LIFECYCLE_EVENT_VAR)
        .ok()
        .filter(|event| !event.is_empty())
}

/// Verbosity for build stats output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// No logging output
    Silent,
    Error,
    Warn,
    /// Per-build summaries (default)
    #[default]
    Info,
    /// Artifact recording and sink internals
    Debug,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Label attached to every record. Falls back to the package-manager
    /// script name when unset.
    pub identifier: Option<String>,

    /// When false, snapshots are still assembled but go nowhere.
    pub enabled: bool,

    /// Append snapshots to this file as JSON lines.
    pub output: Option<PathBuf>,

    pub log_level: Option<String>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            identifier: None,
            enabled: true,
            output: None,
            log_level: None,
        }
    }
}

impl StatsConfig {
    /// Load configuration for a project rooted at `root`.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let file = root.as_ref().join(CONFIG_FILE);
        Self::load_from(file.exists().then_some(file.as_path()))
    }

    /// Load configuration from an explicit file (if any) plus the environment.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(config_path).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(output) = &self.output {
            if output.as_os_str().is_empty() {
                return Err(Error::InvalidConfig("output path is empty".into()));
            }
        }

        if let Some(level) = &self.log_level {
            level.parse::<LogLevel>().map_err(Error::InvalidConfig)?;
        }

        Ok(())
    }

    /// Parsed `log_level`, if set and valid.
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level.as_deref().and_then(|level| level.parse().ok())
    }

    /// The explicit identifier, else the package-manager lifecycle event.
    pub fn resolved_identifier(&self) -> Option<String> {
        self.resolve_identifier_with(|key| std::env::var(key).ok())
    }

    fn resolve_identifier_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.identifier
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| lookup(LIFECYCLE_EVENT_VAR).filter(|id| !id.is_empty()))
    }

    /// The sink this configuration describes.
    pub fn sink(&self) -> Result<Arc<dyn SnapshotSink>> {
        if !self.enabled {
            return Ok(Arc::new(NoopSink));
        }

        match &self.output {
            Some(path) => Ok(Arc::new(JsonLinesSink::create(path)?)),
            None => Ok(Arc::new(TracingSink)),
        }
    }
}
