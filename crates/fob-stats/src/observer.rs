//! The build observer: accumulate at asset emission, flush at completion.
//!
//! ```text
//! on_artifacts_ready ──reset + record──▶ ArtifactSizes ──▶ on_build_complete
//!        │                                                        │
//!   Continue::resume                              BuildSnapshot ──▶ sink
//! ```
//!
//! Hosts drive the observer through [`BuildListener`]. The host guarantees
//! the two calls for one build are made in order and never concurrently.

use std::fmt;
use std::sync::Arc;

use crate::artifact::{ArtifactSize, ArtifactSizes};
use crate::checkpoint::Continue;
use crate::config::{StatsConfig, lifecycle_event};
use crate::metadata::{CommonMetadataProvider, MetadataProvider};
use crate::sink::SnapshotSink;
use crate::snapshot::BuildSnapshot;
use crate::stats::CompilationStats;

/// The two lifecycle points a host adapter reports.
pub trait BuildListener {
    /// All output artifacts of the current build are final.
    ///
    /// Implementations must release `done` before returning.
    fn on_artifacts_ready<I, N, A>(&mut self, artifacts: I, done: Continue)
    where
        I: IntoIterator<Item = (N, A)>,
        N: Into<String>,
        A: ArtifactSize;

    /// The build is finished and its statistics are final.
    fn on_build_complete(&mut self, stats: &CompilationStats);
}

/// Stateful listener bound to one build configuration.
///
/// Reused across watch-mode rebuilds: every asset emission starts from an
/// empty [`ArtifactSizes`]. A completion without a preceding emission reuses
/// whatever was recorded last.
pub struct BuildObserver {
    identifier: Option<String>,
    artifacts: ArtifactSizes,
    metadata: Arc<dyn MetadataProvider>,
    sink: Arc<dyn SnapshotSink>,
}

impl BuildObserver {
    /// Create an observer tagging records with `identifier`.
    ///
    /// Without one, records are tagged with the package-manager script that
    /// started the build (`npm_lifecycle_event`).
    pub fn new(identifier: Option<String>, sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            identifier: identifier
                .filter(|id| !id.is_empty())
                .or_else(lifecycle_event),
            artifacts: ArtifactSizes::new(),
            metadata: Arc::new(CommonMetadataProvider::new()),
            sink,
        }
    }

    /// Create an observer from loaded configuration.
    ///
    /// The identifier falls back to the package-manager script name.
    pub fn from_config(config: &StatsConfig) -> crate::Result<Self> {
        Ok(Self::new(config.resolved_identifier(), config.sink()?))
    }

    /// Replace the envelope metadata provider.
    pub fn with_metadata_provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = provider;
        self
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Artifact state carried toward the next completion.
    pub fn artifacts(&self) -> &ArtifactSizes {
        &self.artifacts
    }

    /// Start a new build cycle.
    pub fn reset(&mut self) {
        self.artifacts.reset();
    }

    /// Replace the artifact state with one build's enumeration.
    pub fn record_artifacts<I, N, A>(&mut self, artifacts: I)
    where
        I: IntoIterator<Item = (N, A)>,
        N: Into<String>,
        A: ArtifactSize,
    {
        self.reset();
        for (name, artifact) in artifacts {
            self.artifacts.record(name, artifact.size());
        }

        tracing::debug!(
            files = self.artifacts.len(),
            total = self.artifacts.total(),
            "recorded build artifacts"
        );
    }

    /// Assemble the record for a completed build without emitting it.
    pub fn snapshot(&self, stats: &CompilationStats) -> BuildSnapshot {
        let metadata = self
            .metadata
            .metadata(stats.time_or_unknown(), self.identifier.as_deref());
        BuildSnapshot::assemble(stats, &self.artifacts, metadata)
    }
}

impl BuildListener for BuildObserver {
    fn on_artifacts_ready<I, N, A>(&mut self, artifacts: I, done: Continue)
    where
        I: IntoIterator<Item = (N, A)>,
        N: Into<String>,
        A: ArtifactSize,
    {
        self.record_artifacts(artifacts);
        done.resume();
    }

    fn on_build_complete(&mut self, stats: &CompilationStats) {
        let snapshot = self.snapshot(stats);

        tracing::info!(
            identifier = self.identifier.as_deref().unwrap_or("-"),
            hash = snapshot.compilation_hash().unwrap_or("-"),
            files = snapshot.bundle_files().len(),
            bundle_size = snapshot.bundle_size(),
            cached = snapshot.cached_modules(),
            rebuilt = snapshot.rebuilt_modules(),
            "build stats collected"
        );

        self.sink.dispatch(snapshot);
    }
}

impl fmt::Debug for BuildObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildObserver")
            .field("identifier", &self.identifier)
            .field("artifacts", &self.artifacts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LIFECYCLE_EVENT_VAR;
    use crate::metadata::Metadata;
    use crate::sink::MemorySink;
    use crate::stats::ModuleStats;
    use proptest::prelude::*;
    use serde_json::json;
    use serial_test::serial;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn timing_provider() -> Arc<dyn MetadataProvider> {
        Arc::new(|time: i64, identifier: Option<&str>| {
            let mut metadata = Metadata::new();
            metadata.insert("timeTaken".into(), time.into());
            metadata.insert("customIdentifier".into(), json!(identifier));
            metadata
        })
    }

    fn observer(identifier: Option<&str>) -> (BuildObserver, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let observer = BuildObserver::new(identifier.map(str::to_string), sink.clone())
            .with_metadata_provider(timing_provider());
        (observer, sink)
    }

    #[test]
    fn test_end_to_end_record() {
        let (mut observer, sink) = observer(Some("build"));

        observer.on_artifacts_ready(
            [("main.js", 1000u64), ("vendor.js", 2500)],
            Continue::detached(),
        );
        observer.on_build_complete(
            &CompilationStats::new()
                .hash("abc123")
                .version("5.0.0")
                .time(42)
                .modules([ModuleStats::cached(), ModuleStats::built()]),
        );

        assert_eq!(sink.len(), 1);
        assert_eq!(
            sink.last().unwrap().to_json(),
            json!({
                "timeTaken": 42,
                "customIdentifier": "build",
                "type": "webpack",
                "compilationHash": "abc123",
                "webpackVersion": "5.0.0",
                "nbrOfCachedModules": 1,
                "nbrOfRebuiltModules": 1,
                "bundleFiles": { "main.js": 1000, "vendor.js": 2500 },
                "bundleSize": 3500,
            })
        );
    }

    #[test]
    fn test_emission_signals_host() {
        let (mut observer, _sink) = observer(None);
        let released = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&released);
        observer.on_artifacts_ready(
            std::iter::empty::<(String, u64)>(),
            Continue::new(move || flag.store(true, Ordering::SeqCst)),
        );

        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_zero_artifacts_still_emits() {
        let (mut observer, sink) = observer(None);

        observer.on_artifacts_ready(Vec::<(String, u64)>::new(), Continue::detached());
        observer.on_build_complete(&CompilationStats::default());

        let snapshot = sink.last().unwrap();
        assert!(snapshot.bundle_files().is_empty());
        assert_eq!(snapshot.bundle_size(), 0);
    }

    #[test]
    fn test_rebuild_resets_previous_artifacts() {
        let (mut observer, sink) = observer(None);

        observer.on_artifacts_ready([("old.js", 10u64)], Continue::detached());
        observer.on_build_complete(&CompilationStats::default());
        observer.on_artifacts_ready([("new.js", 7u64)], Continue::detached());
        observer.on_build_complete(&CompilationStats::default());

        let snapshots = sink.take();
        assert_eq!(snapshots.len(), 2);
        assert!(!snapshots[1].bundle_files().contains_key("old.js"));
        assert_eq!(snapshots[1].bundle_size(), 7);
    }

    #[test]
    fn test_completion_without_emission_uses_empty_state() {
        let (mut observer, sink) = observer(None);

        observer.on_build_complete(&CompilationStats::default());

        let snapshot = sink.last().unwrap();
        assert!(snapshot.bundle_files().is_empty());
        assert_eq!(snapshot.bundle_size(), 0);
    }

    #[test]
    fn test_completion_without_emission_reuses_last_state() {
        let (mut observer, sink) = observer(None);

        observer.on_artifacts_ready([("main.js", 5u64)], Continue::detached());
        observer.on_build_complete(&CompilationStats::default());
        observer.on_build_complete(&CompilationStats::default());

        let snapshots = sink.take();
        assert_eq!(snapshots[1].bundle_files(), snapshots[0].bundle_files());
        assert_eq!(snapshots[1].bundle_size(), 5);
    }

    #[test]
    fn test_missing_time_uses_sentinel() {
        let (mut observer, sink) = observer(None);
        observer.on_build_complete(&CompilationStats::default());

        let snapshot = sink.last().unwrap();
        assert_eq!(snapshot.metadata()["timeTaken"], -1);
    }

    #[test]
    #[serial]
    fn test_identifier_defaults_to_lifecycle_event() {
        unsafe { std::env::set_var(LIFECYCLE_EVENT_VAR, "build") };
        let sink = Arc::new(MemorySink::new());
        let mut observer = BuildObserver::new(None, sink.clone());
        unsafe { std::env::remove_var(LIFECYCLE_EVENT_VAR) };

        observer.on_build_complete(&CompilationStats::default());

        assert_eq!(observer.identifier(), Some("build"));
        assert_eq!(sink.last().unwrap().metadata()["customIdentifier"], "build");
    }

    #[test]
    #[serial]
    fn test_explicit_identifier_beats_lifecycle_event() {
        unsafe { std::env::set_var(LIFECYCLE_EVENT_VAR, "build") };
        let (observer, _sink) = observer(Some("nightly"));
        unsafe { std::env::remove_var(LIFECYCLE_EVENT_VAR) };

        assert_eq!(observer.identifier(), Some("nightly"));
    }

    #[test]
    #[serial]
    fn test_no_identifier_without_lifecycle_event() {
        unsafe { std::env::remove_var(LIFECYCLE_EVENT_VAR) };
        let (mut observer, sink) = observer(None);
        observer.on_build_complete(&CompilationStats::default());

        assert_eq!(observer.identifier(), None);
        assert!(sink.last().unwrap().metadata()["customIdentifier"].is_null());
    }

    #[test]
    fn test_snapshot_does_not_emit() {
        let (mut observer, sink) = observer(None);
        observer.record_artifacts([("a.js", 1u64)]);

        let snapshot = observer.snapshot(&CompilationStats::default());
        assert_eq!(snapshot.bundle_size(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_default_provider_tags_identifier() {
        let sink = Arc::new(MemorySink::new());
        let mut observer = BuildObserver::new(Some("test".into()), sink.clone());
        observer.on_build_complete(&CompilationStats::new().time(3));

        let record = sink.last().unwrap().to_json();
        assert_eq!(record["customIdentifier"], "test");
        assert_eq!(record["timeTaken"], 3);
        assert!(record["id"].is_string());
    }

    proptest! {
        #[test]
        fn only_latest_build_is_recorded(
            first in proptest::collection::btree_map("a[a-z]{0,6}\\.js", 0u64..10_000, 0..16),
            second in proptest::collection::btree_map("b[a-z]{0,6}\\.js", 0u64..10_000, 0..16),
        ) {
            let (mut observer, _sink) = observer(None);
            observer.on_artifacts_ready(first.clone(), Continue::detached());
            observer.on_artifacts_ready(second.clone(), Continue::detached());

            let recorded = observer.artifacts();
            prop_assert_eq!(recorded.len(), second.len());
            prop_assert!(first.keys().all(|name| recorded.get(name).is_none()));
            prop_assert_eq!(recorded.total(), second.values().sum::<u64>());
        }
    }
}
