//! Per-build artifact size accumulation.
//!
//! [`ArtifactSizes`] is the state carried from the asset-emission phase to the
//! build-completion phase. It is reset at the start of every emission so that
//! each build's record is self-contained.

use indexmap::IndexMap;
use serde::Serialize;

/// Anything that can report the byte size of an emitted artifact.
///
/// Hosts hand the observer a name → handle mapping; the handle only needs to
/// answer how many bytes it holds.
pub trait ArtifactSize {
    /// Size of the artifact in bytes.
    fn size(&self) -> u64;
}

impl ArtifactSize for u64 {
    fn size(&self) -> u64 {
        *self
    }
}

impl ArtifactSize for usize {
    fn size(&self) -> u64 {
        *self as u64
    }
}

impl ArtifactSize for [u8] {
    fn size(&self) -> u64 {
        self.len() as u64
    }
}

impl ArtifactSize for Vec<u8> {
    fn size(&self) -> u64 {
        self.len() as u64
    }
}

impl ArtifactSize for str {
    fn size(&self) -> u64 {
        self.len() as u64
    }
}

impl ArtifactSize for String {
    fn size(&self) -> u64 {
        self.len() as u64
    }
}

impl<T: ArtifactSize + ?Sized> ArtifactSize for &T {
    fn size(&self) -> u64 {
        (**self).size()
    }
}

/// Artifact name → byte size for the most recent build, plus the running total.
///
/// The total is maintained from the recorded sizes, never queried on its own,
/// so `total()` always equals the sum of `files()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactSizes {
    files: IndexMap<String, u64>,
    total: u64,
}

impl ArtifactSizes {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything recorded so far.
    pub fn reset(&mut self) {
        self.files.clear();
        self.total = 0;
    }

    /// Record one artifact.
    ///
    /// A name recorded twice replaces its earlier size; the total is adjusted
    /// so it still matches the mapping.
    pub fn record(&mut self, name: impl Into<String>, size: u64) {
        let name = name.into();
        if let Some(previous) = self.files.insert(name, size) {
            self.total -= previous;
        }
        self.total += size;
    }

    /// Recorded sizes in enumeration order.
    pub fn files(&self) -> &IndexMap<String, u64> {
        &self.files
    }

    /// Sum of all recorded sizes.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Size of a single artifact, if recorded.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.files.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, u64)> for ArtifactSizes {
    fn from_iter<I: IntoIterator<Item = (N, u64)>>(iter: I) -> Self {
        let mut sizes = Self::new();
        for (name, size) in iter {
            sizes.record(name, size);
        }
        sizes
    }
}
