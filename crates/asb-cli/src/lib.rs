//! asb - asset bundle builder
#![allow(clippy::missing_errors_doc)]
//!
//! Assembles the asset directory an offline installer ships with: downloaded
//! artifacts, post-install scripts and the manifest describing them.
//!
//! # Bundle Layout
//!
//! ```text
//! assets/
//! ├── artifacts/      # {package}-{arch}{ext}, {package}-{arch}-add{n}{ext}
//! ├── scripts/        # {package}/{script}
//! └── manifest.json   # every path relative to assets/
//! ```

pub mod cmd;
pub mod plan;
pub mod ui;

pub use asb_core::USER_AGENT;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// asb - build self-contained installer asset bundles
#[derive(Debug, Parser)]
#[command(name = "asb")]
#[command(author, version)]
pub struct Cli {
    /// Configuration file (defaults to ./asb.toml when present)
    #[arg(long, global = true, env = "ASB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a bundle from a plan file
    Build {
        /// Bundle plan ([[artifact]] and [[script]] tables)
        plan: PathBuf,
        /// Record artifact URLs without downloading (installer fetches them)
        #[arg(long)]
        online: bool,
        /// Asset directory, overriding the configuration
        #[arg(long)]
        assets_dir: Option<PathBuf>,
        /// Artifacts onboarded concurrently
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
        jobs: u16,
    },
    /// Reset the asset directory to an empty layout
    Init {
        /// Asset directory, overriding the configuration
        #[arg(long)]
        assets_dir: Option<PathBuf>,
    },
    /// Show the contents of a saved manifest
    Show {
        /// Manifest file (defaults to the configured bundle's manifest)
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
