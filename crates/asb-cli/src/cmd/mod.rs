//! Command implementations
//!
//! Each submodule handles one subcommand. [`Context`] carries the resolved
//! configuration and builds the registry the commands operate on.

pub mod build;
pub mod completions;
pub mod init;
pub mod show;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use asb_core::{
    AssetLayout, AssetRegistry, BundleConfig, HttpDownloader, JsonManifestStore, PathProvider,
};

/// The registry assembled from the default collaborators.
pub type Registry = AssetRegistry<Arc<AssetLayout>, HttpDownloader, JsonManifestStore>;

/// Resolved configuration shared by the commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration (file, then environment, then flags)
    pub config: BundleConfig,
    /// Directory relative `assets_dir` values resolve against
    pub base: PathBuf,
}

impl Context {
    /// Load `config_path`, or discover `asb.toml` in the working directory.
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to resolve working directory")?;

        let (config, base) = match config_path {
            Some(path) => {
                let base = match path.parent() {
                    Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                    _ => cwd,
                };
                (BundleConfig::load(path).await?, base)
            }
            None => (BundleConfig::discover(&cwd).await?, cwd),
        };

        Ok(Self::new(config.apply_env(), base))
    }

    /// Context over an already resolved configuration.
    pub fn new(config: BundleConfig, base: impl Into<PathBuf>) -> Self {
        Self {
            config,
            base: base.into(),
        }
    }

    /// Override the asset directory. A relative flag value is taken from the
    /// working directory, not the config file's.
    pub fn with_assets_dir(mut self, assets_dir: Option<&Path>) -> Result<Self> {
        if let Some(dir) = assets_dir {
            self.config.assets_dir = std::path::absolute(dir)
                .with_context(|| format!("Invalid asset directory {}", dir.display()))?;
        }
        Ok(self)
    }

    /// Bundle layout for the configured asset directory.
    pub fn layout(&self) -> Result<Arc<AssetLayout>> {
        let layout = self
            .config
            .layout(&self.base)
            .context("Failed to resolve asset directory")?;
        Ok(Arc::new(layout))
    }

    /// Registry with the HTTP downloader and an empty manifest.
    pub fn registry(&self) -> Result<Registry> {
        let layout = self.layout()?;
        let downloader = HttpDownloader::new(layout.assets_artifacts_directory(), &self.config)
            .context("Failed to create HTTP client")?;
        Ok(AssetRegistry::new(
            layout,
            downloader,
            JsonManifestStore::new(),
        ))
    }
}
