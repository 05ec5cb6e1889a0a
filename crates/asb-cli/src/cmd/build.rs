//! Build command - assemble a bundle from a plan file.

use std::path::Path;

use anyhow::{Context as _, Result};
use asb_core::{PathProvider, Reporter, ScriptOutcome};
use asb_schema::{Artifact, Script};
use crossterm::style::Stylize;
use futures::{StreamExt, TryStreamExt, stream};
use tracing::info;

use super::{Context, Registry};
use crate::plan::BundlePlan;
use crate::ui::ConsoleReporter;

/// What a build put into the bundle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Artifact records as appended
    pub artifacts: Vec<Artifact>,
    /// Script records as appended
    pub scripts: Vec<Script>,
    /// Script sources that did not exist
    pub skipped: usize,
}

/// Build the bundle described by `plan_path`.
///
/// The asset directory is reset first. With `online`, artifacts are recorded
/// with their URLs and nothing is downloaded.
pub async fn build(
    ctx: &Context,
    plan_path: &Path,
    online: bool,
    jobs: usize,
    quiet: bool,
) -> Result<()> {
    let plan = BundlePlan::load(plan_path).await?;
    let registry = ctx.registry()?;
    let reporter = ConsoleReporter::new(quiet);

    let summary = run(&registry, plan, !online, jobs, &reporter).await?;

    if !quiet {
        println!(
            "{} {} artifacts and {} scripts into {}",
            "Bundled".green().bold(),
            summary.artifacts.len(),
            summary.scripts.len(),
            registry.paths().assets_directory().display()
        );
    }
    Ok(())
}

/// Initialize, onboard every plan entry and save the manifest.
///
/// Up to `jobs` artifacts are onboarded at once; manifest entries then follow
/// completion order.
pub async fn run(
    registry: &Registry,
    plan: BundlePlan,
    download: bool,
    jobs: usize,
    reporter: &dyn Reporter,
) -> Result<BuildSummary> {
    registry
        .initialize()
        .context("Failed to initialize asset directory")?;
    info!(
        "Building bundle with {} artifacts and {} scripts",
        plan.artifacts.len(),
        plan.scripts.len()
    );

    let artifacts: Vec<Artifact> = stream::iter(plan.artifacts)
        .map(|artifact| {
            let key = artifact.key();
            async move {
                registry
                    .add_artifact(artifact, download, Some(reporter))
                    .await
                    .with_context(|| format!("Failed to add artifact {key}"))
            }
        })
        .buffer_unordered(jobs.max(1))
        .try_collect()
        .await?;

    let mut summary = BuildSummary {
        artifacts,
        ..BuildSummary::default()
    };

    for script in plan.scripts {
        let package = script.package.clone();
        match registry
            .add_script(script)
            .with_context(|| format!("Failed to add script for {package}"))?
        {
            ScriptOutcome::Added(script) => summary.scripts.push(script),
            ScriptOutcome::Skipped { source } => {
                reporter.warning(&format!(
                    "Skipping script for {package}: {} not found",
                    source.display()
                ));
                summary.skipped += 1;
            }
        }
    }

    registry.save_manifest().context("Failed to save manifest")?;
    Ok(summary)
}
