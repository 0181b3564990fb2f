#![cfg_attr(docsrs, feature(doc_cfg))]

//! # fob-stats
//!
//! Per-build telemetry for bundlers: output artifact sizes, module cache
//! effectiveness, timing and version identifiers, packaged into one record per
//! build and handed to a sink.
//!
//! The crate is host-agnostic. A bundler adapter (see `fob-plugin-stats` for
//! Rolldown) reports two lifecycle points through [`BuildListener`]:
//!
//! 1. **asset emission** - every output artifact with its byte size. The
//!    observer resets its state and records the new build's artifacts, then
//!    releases the host via [`Continue`].
//! 2. **build completion** - final [`CompilationStats`]. The observer merges
//!    them with the recorded artifacts and envelope metadata into a
//!    [`BuildSnapshot`] and dispatches it to the sink.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use fob_stats::{BuildListener, BuildObserver, CompilationStats, Continue, MemorySink, ModuleStats};
//!
//! let sink = Arc::new(MemorySink::new());
//! let mut observer = BuildObserver::new(Some("build".into()), sink.clone());
//!
//! observer.on_artifacts_ready([("main.js", 1000u64), ("vendor.js", 2500)], Continue::detached());
//! observer.on_build_complete(
//!     &CompilationStats::new()
//!         .hash("abc123")
//!         .time(42)
//!         .modules([ModuleStats::cached(), ModuleStats::built()]),
//! );
//!
//! let snapshot = sink.last().unwrap();
//! assert_eq!(snapshot.bundle_size(), 3500);
//! assert_eq!(snapshot.cached_modules(), 1);
//! ```

pub mod artifact;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod metadata;
pub mod observer;
pub mod sink;
pub mod snapshot;
pub mod stats;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

pub use artifact::{ArtifactSize, ArtifactSizes};
pub use checkpoint::Continue;
pub use config::{LogLevel, StatsConfig};
pub use error::{Error, Result};
pub use metadata::{CommonMetadataProvider, Metadata, MetadataProvider};
pub use observer::{BuildListener, BuildObserver};
pub use sink::{ChannelSink, JsonLinesSink, MemorySink, NoopSink, SnapshotSink, TracingSink};
pub use snapshot::{BuildSnapshot, SNAPSHOT_KIND};
pub use stats::{CompilationStats, ModuleCounts, ModuleStats, UNKNOWN_TIME};

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{init_logging, init_logging_from_config, init_logging_from_env};
