//! Module fingerprints carried between builds.
//!
//! Rolldown does not report whether a module was served from cache, so the
//! adapter derives the flag itself: a module whose source hashes the same as in
//! the previous build is `cached`, a new or changed one is `built`, and one
//! whose source cannot be read (virtual modules, runtime helpers) is neither.

use fob_stats::ModuleStats;
use rustc_hash::{FxHashMap, FxHashSet};

/// A module id and the BLAKE3 hash of its source, `None` when unreadable.
pub type SourceFingerprint = (String, Option<blake3::Hash>);

/// Read and hash every module source from disk.
///
/// Blocking; async callers run it through `spawn_blocking`.
pub fn fingerprint_sources<I, S>(module_ids: I) -> Vec<SourceFingerprint>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fingerprint_with(module_ids, |id| std::fs::read(id).ok())
}

fn fingerprint_with<I, S>(
    module_ids: I,
    read: impl Fn(&str) -> Option<Vec<u8>>,
) -> Vec<SourceFingerprint>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    module_ids
        .into_iter()
        .map(|id| {
            let id = id.as_ref();
            (id.to_string(), read(id).map(|source| blake3::hash(&source)))
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct ModuleLedger {
    fingerprints: FxHashMap<String, blake3::Hash>,
}

impl ModuleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag the modules of one build, reading sources from disk.
    pub fn observe<I, S>(&mut self, module_ids: I) -> Vec<ModuleStats>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.update(fingerprint_sources(module_ids))
    }

    /// Flag the modules of one build using `read` to load each source.
    pub fn observe_with<I, S>(
        &mut self,
        module_ids: I,
        read: impl Fn(&str) -> Option<Vec<u8>>,
    ) -> Vec<ModuleStats>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.update(fingerprint_with(module_ids, read))
    }

    /// Flag the modules of one build from precomputed fingerprints.
    ///
    /// Fingerprints of modules absent from this build are forgotten, so a
    /// module that drops out and comes back later counts as built.
    pub fn update(
        &mut self,
        fingerprints: impl IntoIterator<Item = SourceFingerprint>,
    ) -> Vec<ModuleStats> {
        let mut seen = FxHashSet::default();
        let mut modules = Vec::new();

        for (id, fingerprint) in fingerprints {
            if !seen.insert(id.clone()) {
                continue;
            }

            let Some(fingerprint) = fingerprint else {
                self.fingerprints.remove(&id);
                modules.push(ModuleStats::unflagged());
                continue;
            };

            let unchanged = self
                .fingerprints
                .insert(id, fingerprint)
                .is_some_and(|previous| previous == fingerprint);

            modules.push(if unchanged {
                ModuleStats::cached()
            } else {
                ModuleStats::built()
            });
        }

        self.fingerprints.retain(|id, _| seen.contains(id));

        tracing::debug!(
            modules = modules.len(),
            tracked = self.fingerprints.len(),
            "updated module fingerprints"
        );

        modules
    }

    /// Number of modules with a remembered fingerprint.
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Forget everything; the next build counts every module as built.
    pub fn clear(&mut self) {
        self.fingerprints.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fob_stats::ModuleCounts;

    fn sources(files: &[(&str, &str)]) -> impl Fn(&str) -> Option<Vec<u8>> {
        let files: FxHashMap<String, Vec<u8>> = files
            .iter()
            .map(|(id, code)| (id.to_string(), code.as_bytes().to_vec()))
            .collect();
        move |id: &str| files.get(id).cloned()
    }

    fn counts(modules: &[ModuleStats]) -> ModuleCounts {
        ModuleCounts::from_modules(Some(modules))
    }

    #[test]
    fn test_first_build_marks_everything_built() {
        let mut ledger = ModuleLedger::new();
        let modules = ledger.observe_with(["a.js", "b.js"], sources(&[("a.js", "a"), ("b.js", "b")]));

        assert_eq!(counts(&modules), ModuleCounts { cached: 0, rebuilt: 2 });
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_unchanged_modules_are_cached() {
        let mut ledger = ModuleLedger::new();
        ledger.observe_with(["a.js", "b.js"], sources(&[("a.js", "a"), ("b.js", "b")]));

        let modules =
            ledger.observe_with(["a.js", "b.js"], sources(&[("a.js", "a"), ("b.js", "b2")]));

        assert_eq!(modules[0], ModuleStats::cached());
        assert_eq!(modules[1], ModuleStats::built());
    }

    #[test]
    fn test_unreadable_module_is_unflagged() {
        let mut ledger = ModuleLedger::new();
        let modules = ledger.observe_with(["\0virtual", "a.js"], sources(&[("a.js", "a")]));

        assert_eq!(modules[0], ModuleStats::unflagged());
        assert_eq!(counts(&modules), ModuleCounts { cached: 0, rebuilt: 1 });
    }

    #[test]
    fn test_dropped_module_is_forgotten() {
        let mut ledger = ModuleLedger::new();
        let read = sources(&[("a.js", "a"), ("b.js", "b")]);

        ledger.observe_with(["a.js", "b.js"], &read);
        ledger.observe_with(["a.js"], &read);
        let modules = ledger.observe_with(["a.js", "b.js"], &read);

        assert_eq!(ledger.len(), 2);
        assert_eq!(counts(&modules), ModuleCounts { cached: 1, rebuilt: 1 });
    }

    #[test]
    fn test_duplicate_ids_count_once() {
        let mut ledger = ModuleLedger::new();
        let modules = ledger.observe_with(["a.js", "a.js"], sources(&[("a.js", "a")]));
        assert_eq!(modules.len(), 1);
    }

    #[test]
    fn test_fingerprints_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.js");
        std::fs::write(&file, "export const a = 1;").unwrap();
        let file = file.to_string_lossy().into_owned();

        let fingerprints = fingerprint_sources([file.as_str(), "\0virtual:helper"]);
        assert_eq!(fingerprints[0].1, Some(blake3::hash(b"export const a = 1;")));
        assert_eq!(fingerprints[1].1, None);

        let mut ledger = ModuleLedger::new();
        ledger.update(fingerprints.clone());
        let modules = ledger.update(fingerprints);
        assert_eq!(modules, vec![ModuleStats::cached(), ModuleStats::unflagged()]);
    }

    #[test]
    fn test_clear_forgets_fingerprints() {
        let mut ledger = ModuleLedger::new();
        let read = sources(&[("a.js", "a")]);
        ledger.observe_with(["a.js"], &read);
        ledger.clear();

        let modules = ledger.observe_with(["a.js"], &read);
        assert_eq!(modules[0], ModuleStats::built());
    }
}
