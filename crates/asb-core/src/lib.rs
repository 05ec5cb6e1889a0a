//! Core library for asb: builds self-contained installer asset bundles.
//!
//! The [`AssetRegistry`] is the entry point. It is assembled from three
//! collaborators, each behind a trait so tests can swap them:
//!
//! - [`PathProvider`] (default [`AssetLayout`]): where the bundle lives
//! - [`Downloader`] (default [`HttpDownloader`]): fetches artifact bytes
//! - [`ManifestStore`] (default [`JsonManifestStore`]): collects and saves records

pub mod config;
pub mod io;
pub mod manifest;
pub mod paths;
pub mod registry;
pub mod reporter;

pub use config::BundleConfig;
pub use io::download::{DownloadError, Downloader, HttpDownloader};
pub use manifest::{JsonManifestStore, ManifestError, ManifestStore};
pub use paths::{AssetLayout, PathProvider};
pub use registry::{AssetRegistry, RegistryError, ScriptOutcome, relocatable_path};
pub use reporter::{NullReporter, Reporter};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("asb-core/", env!("CARGO_PKG_VERSION"));
