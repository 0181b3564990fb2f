//! Rolldown plugin that reports per-build stats
//!
//! This crate adapts the host-agnostic [`fob_stats::BuildObserver`] to the
//! Rolldown bundler pipeline:
//!
//! - the `generate_bundle` hook is the asset-emission phase: every output's
//!   filename and byte size is recorded and the hook returns immediately;
//! - build completion is reported by the caller once `generate()` or
//!   `write()` returns, usually through [`observed_generate`] or
//!   [`observed_write`], which also time the build.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fob_plugin_stats::{BuildStatsPlugin, observed_generate};
//! use fob_stats::StatsConfig;
//! use rolldown::{BundlerBuilder, BundlerOptions, InputItem};
//! use rolldown_plugin::__inner::SharedPluginable;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let plugin = BuildStatsPlugin::from_config(&StatsConfig::load(".")?)?;
//!
//! let options = BundlerOptions {
//!     input: Some(vec![InputItem { name: None, import: "./src/index.js".to_string() }]),
//!     ..Default::default()
//! };
//! let shared: SharedPluginable = Arc::new(plugin.clone());
//! let mut bundler = BundlerBuilder::default()
//!     .with_options(options)
//!     .with_plugins(vec![shared])
//!     .build()
//!     .map_err(|e| format!("{:?}", e))?;
//!
//! let output = observed_generate(&mut bundler, &plugin).await?;
//! println!("{} outputs", output.assets.len());
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use fob_stats::{BuildListener, BuildObserver, CompilationStats, Continue, StatsConfig};
use parking_lot::Mutex;
use rolldown_common::Output;
use rolldown_plugin::{HookGenerateBundleArgs, HookNoopReturn, HookUsage, Plugin, PluginContext};

pub mod build;
pub mod collect;
pub mod error;
pub mod ledger;

pub use build::{observed_generate, observed_write};
pub use collect::{ROLLDOWN_VERSION, collect_stats, compilation_hash, stats_for_modules};
pub use error::{Error, Result};
pub use ledger::{ModuleLedger, SourceFingerprint, fingerprint_sources};

/// Rolldown plugin feeding a [`BuildObserver`]
///
/// Clones share the same observer and module ledger, so one clone can be
/// registered with the bundler while another reports completion.
///
/// # Architecture
///
/// ```text
/// generate_bundle(outputs) → observer.on_artifacts_ready → hook resolves
/// generate() returns       → collect_stats → observer.on_build_complete → sink
/// ```
#[derive(Debug, Clone)]
pub struct BuildStatsPlugin {
    observer: Arc<Mutex<BuildObserver>>,
    ledger: Arc<Mutex<ModuleLedger>>,
}

impl BuildStatsPlugin {
    /// Register an observer with Rolldown.
    pub fn new(observer: BuildObserver) -> Self {
        Self {
            observer: Arc::new(Mutex::new(observer)),
            ledger: Arc::new(Mutex::new(ModuleLedger::new())),
        }
    }

    /// Create a plugin whose observer and sink come from configuration.
    pub fn from_config(config: &StatsConfig) -> Result<Self> {
        Ok(Self::new(BuildObserver::from_config(config)?))
    }

    /// Shared handle to the observer.
    pub fn observer(&self) -> Arc<Mutex<BuildObserver>> {
        Arc::clone(&self.observer)
    }

    /// Record one build's outputs.
    pub fn record_outputs(&self, outputs: &[Output]) {
        let artifacts = outputs
            .iter()
            .map(|output| (output.filename().to_string(), output.content_as_bytes().len()));

        // The hook future resolving is what releases Rolldown.
        self.observer
            .lock()
            .on_artifacts_ready(artifacts, Continue::detached());
    }

    /// Report completion with statistics gathered elsewhere.
    pub fn complete(&self, stats: &CompilationStats) {
        self.observer.lock().on_build_complete(stats);
    }

    /// Report completion for the given outputs, deriving hash, version and
    /// module flags from them.
    ///
    /// Reads module sources on the calling thread; async hosts use
    /// [`observed_generate`] or [`observed_write`] instead.
    pub fn complete_with_outputs(&self, outputs: &[Output], elapsed: Option<Duration>) {
        let stats = collect_stats(outputs, elapsed, &mut self.ledger.lock());
        self.complete(&stats);
    }

    /// Report completion using source fingerprints computed off the lock.
    pub fn complete_with_fingerprints(
        &self,
        outputs: &[Output],
        elapsed: Option<Duration>,
        fingerprints: Vec<SourceFingerprint>,
    ) {
        let modules = self.ledger.lock().update(fingerprints);
        self.complete(&stats_for_modules(outputs, elapsed, modules));
    }
}

impl Plugin for BuildStatsPlugin {
    fn name(&self) -> Cow<'static, str> {
        "fob-build-stats".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::GenerateBundle
    }

    fn generate_bundle(
        &self,
        _ctx: &PluginContext,
        args: &mut HookGenerateBundleArgs<'_>,
    ) -> impl std::future::Future<Output = HookNoopReturn> + Send {
        self.record_outputs(&args.bundle[..]);

        async { Ok(()) }
    }
}
