//! Timed builds that report completion to the stats plugin.

use std::time::{Duration, Instant};

use rolldown::{BundleOutput, Bundler};
use tokio::task;

use crate::collect::module_ids;
use crate::ledger::fingerprint_sources;
use crate::{BuildStatsPlugin, Error, Result};

/// Run `bundler.generate()` and report the finished build to `plugin`.
///
/// The plugin must be registered with `bundler`; its `generate_bundle` hook
/// records the outputs, and this function reports completion once the bundle
/// is final. A failed build reports nothing.
pub async fn observed_generate(
    bundler: &mut Bundler,
    plugin: &BuildStatsPlugin,
) -> Result<BundleOutput> {
    let started = Instant::now();

    let output = bundler
        .generate()
        .await
        .map_err(|e| Error::from_rolldown_batch(&e))?;

    report_completion(plugin, &output, started.elapsed()).await?;

    Ok(output)
}

/// Run `bundler.write()` and report the finished build to `plugin`.
///
/// Same as [`observed_generate`], with the outputs also written to the
/// configured output directory before completion is reported.
pub async fn observed_write(
    bundler: &mut Bundler,
    plugin: &BuildStatsPlugin,
) -> Result<BundleOutput> {
    let started = Instant::now();

    let output = bundler
        .write()
        .await
        .map_err(|e| Error::from_rolldown_batch(&e))?;

    report_completion(plugin, &output, started.elapsed()).await?;

    Ok(output)
}

async fn report_completion(
    plugin: &BuildStatsPlugin,
    output: &BundleOutput,
    elapsed: Duration,
) -> Result<()> {
    let ids = module_ids(&output.assets);
    let fingerprints = task::spawn_blocking(move || fingerprint_sources(ids))
        .await
        .map_err(|e| Error::Task(format!("Task join error: {}", e)))?;

    plugin.complete_with_fingerprints(&output.assets, Some(elapsed), fingerprints);
    Ok(())
}
