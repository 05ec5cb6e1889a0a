//! Init command - reset the asset directory.

use anyhow::{Context as _, Result};
use asb_core::PathProvider;
use crossterm::style::Stylize;

use super::Context;

/// Reset the configured asset directory to an empty layout.
pub fn init(ctx: &Context, quiet: bool) -> Result<()> {
    let registry = ctx.registry()?;
    registry
        .initialize()
        .context("Failed to initialize asset directory")?;

    if !quiet {
        println!(
            "{} {}",
            "Initialized".green().bold(),
            registry.paths().assets_directory().display()
        );
    }
    Ok(())
}
