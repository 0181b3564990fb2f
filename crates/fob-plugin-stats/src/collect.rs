//! Compilation statistics derived from a Rolldown bundle output.

use std::collections::BTreeSet;
use std::time::Duration;

use fob_stats::{CompilationStats, ModuleStats};
use rolldown_common::Output;

use crate::ledger::ModuleLedger;

/// Rolldown version reported as the tool version.
///
/// Should match workspace.dependencies.rolldown.version
pub const ROLLDOWN_VERSION: &str = "0.5.1";

/// Hex digits kept from the BLAKE3 digest.
const HASH_LENGTH: usize = 20;

/// Content hash of a whole build: every output's filename and bytes, in
/// filename order.
pub fn compilation_hash(outputs: &[Output]) -> String {
    let mut sorted: Vec<&Output> = outputs.iter().collect();
    sorted.sort_by(|a, b| a.filename().cmp(b.filename()));

    let mut hasher = blake3::Hasher::new();
    for output in sorted {
        hasher.update(output.filename().as_bytes());
        hasher.update(&[0]);
        hasher.update(output.content_as_bytes());
        hasher.update(&[0]);
    }

    let mut hash = hasher.finalize().to_hex().to_string();
    hash.truncate(HASH_LENGTH);
    hash
}

/// Ids of every module rendered into a chunk, deduplicated and sorted.
pub fn module_ids(outputs: &[Output]) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    for output in outputs {
        if let Output::Chunk(chunk) = output {
            for module_id in chunk.modules.keys.iter() {
                let id: &str = module_id.as_ref();
                ids.insert(id.to_string());
            }
        }
    }
    ids
}

/// Convert an elapsed duration to whole milliseconds.
pub fn elapsed_millis(elapsed: Duration) -> i64 {
    i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
}

/// Build the statistics Rolldown itself does not report.
///
/// `ledger` carries module fingerprints from the previous build so unchanged
/// modules are flagged as cached.
pub fn collect_stats(
    outputs: &[Output],
    elapsed: Option<Duration>,
    ledger: &mut ModuleLedger,
) -> CompilationStats {
    let modules = ledger.observe(module_ids(outputs));
    stats_for_modules(outputs, elapsed, modules)
}

/// Statistics for `outputs` with module flags already derived.
pub fn stats_for_modules(
    outputs: &[Output],
    elapsed: Option<Duration>,
    modules: Vec<ModuleStats>,
) -> CompilationStats {
    CompilationStats {
        hash: Some(compilation_hash(outputs)),
        version: Some(ROLLDOWN_VERSION.to_string()),
        time: elapsed.map(elapsed_millis),
        modules: Some(modules),
    }
}
