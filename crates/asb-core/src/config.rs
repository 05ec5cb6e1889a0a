//! Bundle build configuration.
//!
//! Read from an optional `asb.toml`, then overridden by `ASB_*` environment
//! variables. Every field has a default so an empty file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::paths::{ASSETS_DIR_ENV, AssetLayout, DEFAULT_MANIFEST_FILE};

/// Configuration file looked up by [`BundleConfig::discover`].
pub const CONFIG_FILE: &str = "asb.toml";

/// Environment variable overriding the manifest file name.
pub const MANIFEST_FILE_ENV: &str = "ASB_MANIFEST_FILE";

/// Environment variable overriding the download attempt count.
pub const RETRIES_ENV: &str = "ASB_RETRIES";

/// Settings shared by the registry's collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BundleConfig {
    /// Asset root. Relative values resolve against the config file's directory.
    pub assets_dir: PathBuf,
    /// Manifest file name inside the asset root.
    pub manifest_file: String,
    /// `User-Agent` sent with every download.
    pub user_agent: String,
    /// Download attempts per file (at least one is always made).
    pub retries: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            user_agent: crate::USER_AGENT.to_string(),
            retries: 3,
            timeout_secs: 300,
        }
    }
}

impl BundleConfig {
    /// Load and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load `asb.toml` from `dir` if it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn discover(dir: &Path) -> Result<Self> {
        let candidate = dir.join(CONFIG_FILE);
        if fs::try_exists(&candidate).await.unwrap_or(false) {
            Self::load(&candidate).await
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `ASB_ASSETS_DIR`, `ASB_MANIFEST_FILE` and `ASB_RETRIES`.
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ASSETS_DIR_ENV).filter(|v| !v.is_empty()) {
            self.assets_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup(MANIFEST_FILE_ENV).filter(|v| !v.is_empty()) {
            self.manifest_file = file;
        }
        if let Some(raw) = lookup(RETRIES_ENV) {
            match raw.parse() {
                Ok(retries) => self.retries = retries,
                Err(_) => tracing::warn!("Ignoring invalid {RETRIES_ENV}={raw}"),
            }
        }
        self
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the bundle layout, anchoring a relative `assets_dir` at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting path cannot be made absolute or
    /// `manifest_file` is not a plain file name.
    pub fn layout(&self, base: &Path) -> std::io::Result<AssetLayout> {
        let root = if self.assets_dir.is_absolute() {
            self.assets_dir.clone()
        } else {
            base.join(&self.assets_dir)
        };
        AssetLayout::new(root)?.with_manifest_file(&self.manifest_file)
    }
}
