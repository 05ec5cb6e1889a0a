//! Show command - print a saved manifest as a table.

use std::path::Path;

use anyhow::{Context as _, Result};
use asb_core::PathProvider;
use asb_schema::AssetManifest;
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL};

use super::Context;

/// Print the manifest at `manifest`, or the configured bundle's manifest.
pub fn show(ctx: &Context, manifest: Option<&Path>) -> Result<()> {
    let path = match manifest {
        Some(path) => path.to_path_buf(),
        None => ctx.layout()?.assets_manifest_path().to_path_buf(),
    };
    let manifest = asb_core::manifest::load(&path)
        .with_context(|| format!("Failed to load manifest {}", path.display()))?;

    if manifest.is_empty() {
        eprintln!("Manifest {} is empty.", path.display());
        return Ok(());
    }

    println!("{}", manifest_table(&manifest));
    eprintln!(
        "{} artifact(s), {} script(s)",
        manifest.artifacts.len(),
        manifest.scripts.len()
    );
    Ok(())
}

/// One row per artifact, auxiliary payload and script.
pub fn manifest_table(manifest: &AssetManifest) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Kind", "Package", "Arch", "Path", "Source"]);

    for artifact in &manifest.artifacts {
        table.add_row(vec![
            Cell::new("artifact"),
            Cell::new(&artifact.package),
            Cell::new(artifact.arch),
            Cell::new(artifact.path.as_deref().unwrap_or("-")),
            Cell::new(artifact.url.as_deref().unwrap_or("-")),
        ]);
        for add in &artifact.adds {
            table.add_row(vec![
                Cell::new("  add"),
                Cell::new(&artifact.package),
                Cell::new(artifact.arch),
                Cell::new(add.path.as_deref().unwrap_or("-")),
                Cell::new(&add.url),
            ]);
        }
    }

    for script in &manifest.scripts {
        table.add_row(vec![
            Cell::new("script"),
            Cell::new(&script.package),
            Cell::new("-"),
            Cell::new(&script.path),
            Cell::new("-"),
        ]);
    }

    table
}
