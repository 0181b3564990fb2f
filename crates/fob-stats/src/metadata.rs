//! Envelope metadata merged into every snapshot.
//!
//! The observer never inspects metadata; it only asks a provider for an object
//! given the elapsed time and the custom identifier, and merges it into the
//! record.

use std::env;
use std::path::Path;

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Provider-owned fields merged into a snapshot.
pub type Metadata = Map<String, Value>;

/// Builds the common envelope for a record.
pub trait MetadataProvider: Send + Sync {
    /// `time_taken` is the elapsed build time in milliseconds, or -1 when the
    /// host reported none.
    fn metadata(&self, time_taken: i64, identifier: Option<&str>) -> Metadata;
}

impl<F> MetadataProvider for F
where
    F: Fn(i64, Option<&str>) -> Metadata + Send + Sync,
{
    fn metadata(&self, time_taken: i64, identifier: Option<&str>) -> Metadata {
        self(time_taken, identifier)
    }
}

/// Record id, timestamp and a description of the machine that ran the build.
#[derive(Debug, Clone, Default)]
pub struct CommonMetadataProvider {
    project_name: Option<String>,
}

impl CommonMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the project name, which otherwise defaults to the name of the
    /// working directory.
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }
}

impl MetadataProvider for CommonMetadataProvider {
    fn metadata(&self, time_taken: i64, identifier: Option<&str>) -> Metadata {
        let cwd = env::current_dir().ok();
        let project_name = self.project_name.clone().or_else(|| {
            cwd.as_deref()
                .and_then(Path::file_name)
                .map(|name| name.to_string_lossy().into_owned())
        });

        let mut metadata = Map::new();
        metadata.insert("id".into(), Uuid::new_v4().to_string().into());
        metadata.insert("timestamp".into(), Utc::now().to_rfc3339().into());
        metadata.insert("timeTaken".into(), time_taken.into());
        metadata.insert("customIdentifier".into(), optional(identifier.map(str::to_string)));
        metadata.insert("userName".into(), optional(first_env(&["USER", "USERNAME"])));
        metadata.insert("hostname".into(), optional(first_env(&["HOSTNAME", "COMPUTERNAME"])));
        metadata.insert("platform".into(), env::consts::OS.into());
        metadata.insert("arch".into(), env::consts::ARCH.into());
        metadata.insert("cpuCount".into(), num_cpus::get().into());
        metadata.insert(
            "cwd".into(),
            optional(cwd.map(|dir| dir.to_string_lossy().into_owned())),
        );
        metadata.insert("projectName".into(), optional(project_name));
        metadata
    }
}

fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| env::var(key).ok())
        .filter(|value| !value.is_empty())
}

fn optional(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::from)
}
