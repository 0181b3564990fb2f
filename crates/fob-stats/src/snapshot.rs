//! The per-build record handed to a sink.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::artifact::ArtifactSizes;
use crate::metadata::Metadata;
use crate::stats::CompilationStats;

/// Type discriminator the collector uses to route bundler records.
pub const SNAPSHOT_KIND: &str = "webpack";

/// One immutable record summarizing a single build.
///
/// Serializes as a flat JSON object: the provider's metadata first, then the
/// build fields, which win on key collision.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSnapshot {
    compilation_hash: Option<String>,
    tool_version: Option<String>,
    cached_modules: u64,
    rebuilt_modules: u64,
    bundle_files: IndexMap<String, u64>,
    bundle_size: u64,
    metadata: Metadata,
}

impl BuildSnapshot {
    /// Combine final statistics, the accumulated artifacts and envelope
    /// metadata into one record.
    pub fn assemble(stats: &CompilationStats, artifacts: &ArtifactSizes, metadata: Metadata) -> Self {
        let counts = stats.module_counts();
        Self {
            compilation_hash: stats.hash.clone(),
            tool_version: stats.version.clone(),
            cached_modules: counts.cached,
            rebuilt_modules: counts.rebuilt,
            bundle_files: artifacts.files().clone(),
            bundle_size: artifacts.total(),
            metadata,
        }
    }

    pub fn kind(&self) -> &'static str {
        SNAPSHOT_KIND
    }

    pub fn compilation_hash(&self) -> Option<&str> {
        self.compilation_hash.as_deref()
    }

    pub fn tool_version(&self) -> Option<&str> {
        self.tool_version.as_deref()
    }

    pub fn cached_modules(&self) -> u64 {
        self.cached_modules
    }

    pub fn rebuilt_modules(&self) -> u64 {
        self.rebuilt_modules
    }

    pub fn bundle_files(&self) -> &IndexMap<String, u64> {
        &self.bundle_files
    }

    pub fn bundle_size(&self) -> u64 {
        self.bundle_size
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The wire representation as a JSON object.
    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut record = self.metadata.clone();

        record.insert("type".into(), SNAPSHOT_KIND.into());
        record.insert(
            "compilationHash".into(),
            self.compilation_hash.clone().map_or(Value::Null, Value::from),
        );
        record.insert(
            "webpackVersion".into(),
            self.tool_version.clone().map_or(Value::Null, Value::from),
        );
        record.insert("nbrOfCachedModules".into(), self.cached_modules.into());
        record.insert("nbrOfRebuiltModules".into(), self.rebuilt_modules.into());
        record.insert(
            "bundleFiles".into(),
            Value::Object(
                self.bundle_files
                    .iter()
                    .map(|(name, size)| (name.clone(), Value::from(*size)))
                    .collect(),
            ),
        );
        record.insert("bundleSize".into(), self.bundle_size.into());

        record
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.to_json_map())
    }
}

impl Serialize for BuildSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_map().serialize(serializer)
    }
}
